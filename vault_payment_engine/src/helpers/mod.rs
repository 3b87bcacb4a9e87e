mod ipn_signature;
mod order_code;

pub use ipn_signature::{calculate_ipn_signature, verify_ipn_signature};
pub use order_code::{generate_order_code, ORDER_CODE_RANDOM_LEN};
