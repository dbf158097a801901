//! Resilient call layer for the digital-goods supplier API.
//!
//! Every outbound call goes through the [`CallExecutor`]: cache lookup,
//! remote invocation raced against a timeout, response validation, and
//! normalization of every failure into a [`TaphoammoError`].

pub mod cache;
pub mod error;
pub mod executor;
pub mod invoke;
pub mod mock;
pub mod validator;

pub use cache::{CacheEntry, MemoryCache};
pub use error::{
    ErrorCode, Result, TaphoammoError, classify_supplier_message, classify_transport_error,
};
pub use executor::{CallExecutor, CallOptions, CallResult, ExecutorConfig, ResponseSource, params};
pub use invoke::{InvokeError, RemoteInvoker, SUPPLIER_FUNCTION, SupplierMethod};
pub use mock::ScriptedSupplier;
pub use validator::validate;
