//! Maps the internal `RideError` taxonomy onto JSON-RPC 2.0 error objects.
//! The wire `code` (when the variant carries one) rides along in the
//! `data` field so a client can switch on it without string matching
//! `message`.

use jsonrpsee::types::ErrorObject;
use ride_core::RideError;

const VALIDATION: i32 = -32602;
const CONCURRENCY: i32 = -32001;
const TRANSIENT: i32 = -32002;
const BUSINESS: i32 = -32003;
const FATAL: i32 = -32603;

pub fn to_rpc_error(err: RideError) -> ErrorObject<'static> {
    let code_data = err.wire_code();
    match err {
        RideError::Validation { message, .. } => {
            ErrorObject::owned(VALIDATION, message, code_data)
        }
        RideError::Concurrency { message, .. } => {
            ErrorObject::owned(CONCURRENCY, message, code_data)
        }
        RideError::Transient { message } => ErrorObject::owned(TRANSIENT, message, code_data),
        RideError::Business { message, .. } => ErrorObject::owned(BUSINESS, message, code_data),
        RideError::Fatal { message } => ErrorObject::owned(FATAL, message, code_data),
    }
}
