/// ==============================================================================================
/// ======================================== Status Codes ==========================================
/// ==============================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    Ok,
    Cancelled,
    RuntimeError,
}
