pub mod error;
pub mod normalize;
pub mod session;
pub mod traits;
pub mod types;

pub use error::*;
pub use normalize::{sanitize, ColumnarNormalizer, ColumnarQuote};
pub use session::{SessionInfo, TradingSession};
pub use traits::*;
pub use types::*;
