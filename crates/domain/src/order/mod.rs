//! Order context, final order and the aggregator between them.

mod aggregator;
mod context;
mod model;

pub use aggregator::aggregate;
pub use context::{LineItem, OrderContext, PricedCart};
pub use model::{Order, OrderReason, OrderStatus, OrderTotal, OrderWarning};
