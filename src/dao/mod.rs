/// Question bank file loading.
pub mod question_bank;
/// Per-browsing-session identity storage.
pub mod session_store;
/// Storage error types shared by the stores.
pub mod storage;
/// Question usage history persistence.
pub mod usage_store;
