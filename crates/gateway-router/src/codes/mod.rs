//! Response-code intelligence.
//!
//! Two static tables — one per dialect — mapping a response code to its
//! narration, severity, category and recommended action. Codes 00, 10 and
//! 11 are the success family in both dialects.

pub mod bank;
pub mod pos;

/// Log-level weight of a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Classification of a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Success,
    SystemError,
    CardError,
    PinError,
    AccountError,
    SecurityError,
    BusinessError,
    Unknown,
}

/// Everything known about one response code.
#[derive(Debug, Clone)]
pub struct CodeInfo {
    pub code: String,
    pub description: String,
    pub severity: Severity,
    pub category: Category,
    pub recommended_action: String,
}

/// Success family shared by both dialects.
pub fn is_success(code: &str) -> bool {
    matches!(code, "00" | "10" | "11")
}

/// Full info for a POS-dialect code.
pub fn pos_code_info(code: &str) -> CodeInfo {
    pos::info(code)
}

/// Full info for a bank-dialect code.
pub fn bank_code_info(code: &str) -> CodeInfo {
    bank::info(code)
}

/// Recommended operator/customer action, shared across dialects.
pub(crate) fn recommended_action(code: &str) -> &'static str {
    match code {
        "00" | "10" | "11" => "Transaction completed successfully",
        "51" | "59" => "Insufficient funds - Customer should check account balance",
        "55" => "Incorrect PIN - Customer should retry with correct PIN",
        "54" => "Expired card - Customer should contact card issuer for replacement",
        "58" => "Restricted card - Customer should contact card issuer",
        "60" | "61" | "63" => {
            "Transaction limit exceeded - Customer should try smaller amount or contact bank"
        }
        "62" | "83" => "PIN retry limit exceeded - Customer should contact card issuer",
        "68" | "75" => "Transaction declined by bank - Customer should contact card issuer",
        "72" => "Bank system unavailable - Please try again later",
        "90" | "96" | "99" => "System error - Contact system administrator",
        _ => "Transaction declined - Customer should contact card issuer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_family() {
        for code in ["00", "10", "11"] {
            assert!(is_success(code));
            assert_eq!(pos_code_info(code).severity, Severity::Info);
            assert_eq!(bank_code_info(code).category, Category::Success);
        }
        assert!(!is_success("05"));
    }

    #[test]
    fn test_recommended_actions() {
        assert!(recommended_action("51").contains("Insufficient funds"));
        assert!(recommended_action("96").contains("administrator"));
        assert!(recommended_action("05").contains("contact card issuer"));
    }
}
