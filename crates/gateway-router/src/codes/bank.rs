//! Bank-dialect response codes.
//!
//! Narrations follow the issuing host's own wording, which diverges from
//! the POS table for the 58..85 range (withdrawal limits, external
//! declines, CVV/ARQC failures).

use super::{is_success, recommended_action, Category, CodeInfo, Severity};

const BANK_CODES: &[(&str, &str)] = &[
    ("00", "APPROVED - Transaction approved"),
    ("10", "PARTIAL APPROVAL - Partial amount approved"),
    ("11", "V.I.P. APPROVAL - VIP approval"),
    ("01", "Refer to card issuer"),
    ("02", "Refer to card issuer - special condition"),
    ("03", "Invalid merchant or service provider"),
    ("04", "Pickup card"),
    ("05", "Do not honor"),
    ("06", "Error"),
    ("07", "Pickup card, special condition"),
    ("12", "Invalid transaction"),
    ("13", "Invalid amount"),
    ("14", "Invalid account number (no such number)"),
    ("15", "No such issuer"),
    ("30", "Format error"),
    ("41", "Pickup card (lost card)"),
    ("43", "Pickup card (stolen card)"),
    ("51", "Insufficient funds"),
    ("54", "Expired card"),
    ("55", "Incorrect PIN"),
    ("57", "Transaction not permitted to cardholder"),
    ("58", "Restricted Card - Restricted card"),
    (
        "59",
        "Insufficient funds - The withdrawal amount exceeds the available account balance",
    ),
    ("60", "Uses limit exceeded - The card use limit is exceeded (ATM and POS)"),
    (
        "61",
        "Withdrawal limit would be exceeded - As a result of the transaction authorization, the withdrawal limit will be exceeded",
    ),
    ("62", "PIN tries limit was reached - The invalid PIN tries limit is exceeded"),
    ("63", "Withdrawal limit already reached - The withdrawal limit is already reached"),
    ("64", "Credit amount limit - Deposit limit is reached"),
    ("65", "No statement information - There is no information for account statement"),
    ("66", "Statement not available - The Statement request transaction is disabled"),
    ("67", "Invalid cash back amount - Invalid cash back amount"),
    ("68", "External decline - The transaction was declined by external host"),
    (
        "69",
        "No sharing - Unmatched request (the card is not serviced in the particular terminal)",
    ),
    ("71", "Contact card issuer - Contact card issuer"),
    (
        "72",
        "Destination not available - The authorization host is not available, for TCI - the side is Offline",
    ),
    ("73", "Routing error - Routing error"),
    ("74", "Format error - Format error"),
    (
        "75",
        "External decline special condition - The transaction is declined by the external host following the special condition (cardholder is under suspicion)",
    ),
    ("80", "Bad CVV - Bad CVV"),
    ("81", "Bad CVV2 - Bad CVV2"),
    (
        "82",
        "Invalid transaction - Invalid transaction (the transaction with such attributes is prohibited)",
    ),
    (
        "83",
        "PIN tries limit was exceeded - Bad PIN-code tries limit is already reached (i.e. the bad PIN-code tries limit has been reached and the valid PIN is entered)",
    ),
    ("84", "Bad CAVV - Bad 3D Secure Cardholder Authentication Verification Value"),
    ("85", "Bad ARQC - Invalid value of the ARQC cryptogram"),
    ("90", "SYSTEM ERROR - System malfunction"),
    ("91", "Issuer unavailable or switch inoperative"),
    ("92", "Destination cannot be found for routing"),
    ("93", "Transaction cannot be completed - violation of law"),
    ("94", "Duplicate transmission"),
    ("95", "Reconciliation failed"),
    ("96", "System malfunction - System malfunction or certain field error conditions"),
    ("97", "ISSUER/'HSM' OFFLINE - Security module offline"),
    ("98", "MAC error"),
    ("99", "FATAL ERROR - Fatal system error"),
];

const SYSTEM_ERRORS: &[&str] = &[
    "06", "72", "73", "74", "90", "91", "92", "93", "94", "95", "96", "97", "98", "99",
];

const SECURITY_ERRORS: &[&str] = &["55", "62", "75", "80", "81", "83", "84", "85"];

const CARD_ERRORS: &[&str] = &["04", "07", "41", "43", "54", "58"];

const PIN_ERRORS: &[&str] = &["55", "62", "83"];

/// Narration for a bank response code.
pub fn describe(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "Unknown bank response code".to_string();
    }
    BANK_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| description.to_string())
        .unwrap_or_else(|| format!("Unknown bank response code: {code}"))
}

/// System/technical error family on the bank leg.
pub fn is_system_error(code: &str) -> bool {
    SYSTEM_ERRORS.contains(&code)
}

/// Security error family on the bank leg.
pub fn is_security_error(code: &str) -> bool {
    SECURITY_ERRORS.contains(&code)
}

/// Funds-related decline.
pub fn is_insufficient_funds(code: &str) -> bool {
    matches!(code, "51" | "59")
}

/// Limit-related decline.
pub fn is_limit_exceeded(code: &str) -> bool {
    matches!(code, "60" | "61" | "63" | "64")
}

/// Severity for log routing.
pub fn severity(code: &str) -> Severity {
    let code = code.trim();
    if code.is_empty() {
        return Severity::Error;
    }
    if is_success(code) {
        return Severity::Info;
    }
    if is_system_error(code) || is_security_error(code) {
        return Severity::Error;
    }
    Severity::Warn
}

/// Classification with the same precedence rules as the POS table.
pub fn category(code: &str) -> Category {
    let code = code.trim();
    if code.is_empty() {
        return Category::Unknown;
    }
    if is_success(code) {
        Category::Success
    } else if is_system_error(code) {
        Category::SystemError
    } else if PIN_ERRORS.contains(&code) {
        Category::PinError
    } else if is_security_error(code) {
        Category::SecurityError
    } else if CARD_ERRORS.contains(&code) {
        Category::CardError
    } else if is_insufficient_funds(code) || is_limit_exceeded(code) {
        Category::AccountError
    } else {
        Category::BusinessError
    }
}

/// Full info record for a bank code.
pub fn info(code: &str) -> CodeInfo {
    CodeInfo {
        code: code.to_string(),
        description: describe(code),
        severity: severity(code),
        category: category(code),
        recommended_action: recommended_action(code).to_string(),
    }
}

/// Multi-line analysis report for a declined bank response.
pub fn response_analysis(code: &str, amount: Option<&str>) -> String {
    let info = info(code);
    let mut report = String::new();
    report.push_str("=== BANK RESPONSE ANALYSIS ===\n");
    report.push_str(&format!("Response Code: {}\n", info.code));
    report.push_str(&format!("Description: {}\n", info.description));
    report.push_str(&format!("Category: {:?}\n", info.category));
    report.push_str(&format!("Severity: {:?}\n", info.severity));
    report.push_str(&format!("Recommended Action: {}\n", info.recommended_action));
    if let Some(amount) = amount {
        report.push_str(&format!("Transaction Amount: {amount}\n"));
    }
    if is_insufficient_funds(code) {
        report.push_str(
            "INSIGHT: Funds-related decline. Customer may need to check account balance.\n",
        );
    } else if is_limit_exceeded(code) {
        report.push_str(
            "INSIGHT: Transaction exceeds configured limits. Customer may need to contact bank.\n",
        );
    } else if is_security_error(code) {
        report.push_str(
            "INSIGHT: Security-related error. May indicate fraud or authentication issues.\n",
        );
    } else if is_system_error(code) {
        report.push_str("INSIGHT: System-level error. May require technical investigation.\n");
    }
    report.push_str("===============================");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_narrations_diverge_from_pos() {
        assert_eq!(
            describe("61"),
            "Withdrawal limit would be exceeded - As a result of the transaction authorization, the withdrawal limit will be exceeded"
        );
        assert_eq!(describe("98"), "MAC error");
        assert!(describe("47").starts_with("Unknown bank response code"));
    }

    #[test]
    fn test_families() {
        assert!(is_system_error("72"));
        assert!(is_security_error("85"));
        assert!(is_insufficient_funds("59"));
        assert!(is_limit_exceeded("64"));
        assert!(!is_system_error("51"));
    }

    #[test]
    fn test_category_and_severity() {
        assert_eq!(category("94"), Category::SystemError);
        assert_eq!(category("55"), Category::PinError);
        assert_eq!(category("80"), Category::SecurityError);
        assert_eq!(category("58"), Category::CardError);
        assert_eq!(category("64"), Category::AccountError);
        assert_eq!(severity("85"), Severity::Error);
        assert_eq!(severity("68"), Severity::Warn);
    }

    #[test]
    fn test_analysis_report() {
        let report = response_analysis("51", Some("000000200000"));
        assert!(report.contains("Response Code: 51"));
        assert!(report.contains("Transaction Amount: 000000200000"));
        assert!(report.contains("Funds-related decline"));
    }
}
