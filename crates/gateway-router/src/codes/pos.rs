//! POS-dialect response codes.
//!
//! Numeric codes 00..99 are indexed into a fixed table; a handful of alpha
//! codes used by the acquiring network extend it. Blank entries are
//! reserved.

use super::{is_success, recommended_action, Category, CodeInfo, Severity};

/// Descriptions for numeric codes, indexed by code.
const DESCRIPTIONS: [&str; 100] = [
    /* 00 */ "APPROVED",
    /* 01 */ "Refer to card issuer",
    /* 02 */ "Refer to card issuer - special condition",
    /* 03 */ "Invalid merchant or service provider",
    /* 04 */ "Pickup card",
    /* 05 */ "Do not honor",
    /* 06 */ "Error",
    /* 07 */ "Pickup card, special condition (other than lost/stolen card)",
    /* 08 */ "",
    /* 09 */ "",
    /* 10 */ "Partial Approval",
    /* 11 */ "V.I.P. approval",
    /* 12 */ "Invalid transaction",
    /* 13 */ "Invalid amount (currency conversion field overflow) or amount exceeds maximum for card program",
    /* 14 */ "Invalid account number (no such number)",
    /* 15 */ "No such issuer",
    /* 16 */ "",
    /* 17 */ "",
    /* 18 */ "Account number does not exist",
    /* 19 */ "Re-enter transaction",
    /* 20 */ "",
    /* 21 */ "No action taken (unable to back out prior transaction)",
    /* 22 */ "",
    /* 23 */ "",
    /* 24 */ "",
    /* 25 */ "Unable to locate record in file, or account number is missing from the inquiry",
    /* 26 */ "",
    /* 27 */ "",
    /* 28 */ "File is temporarily unavailable",
    /* 29 */ "",
    /* 30 */ "Format error",
    /* 31 */ "",
    /* 32 */ "",
    /* 33 */ "CARD ERROR",
    /* 34 */ "USER DOESNT EXIST",
    /* 35 */ "",
    /* 36 */ "USER STATUS LOCKED",
    /* 37 */ "",
    /* 38 */ "",
    /* 39 */ "",
    /* 40 */ "",
    /* 41 */ "Pickup card (lost card)",
    /* 42 */ "ACCOUNT LOCKED",
    /* 43 */ "Pickup card (stolen card)",
    /* 44 */ "",
    /* 45 */ "SYSTEM ERROR",
    /* 46 */ "User already Exists",
    /* 47 */ "Query Failed",
    /* 48 */ "NO validation",
    /* 49 */ "POS version not supported",
    /* 50 */ "",
    /* 51 */ "Insufficient funds",
    /* 52 */ "No checking account",
    /* 53 */ "No savings account",
    /* 54 */ "Expired card",
    /* 55 */ "Incorrect PIN",
    /* 56 */ "NO CARD RECORD",
    /* 57 */ "Transaction not permitted to cardholder",
    /* 58 */ "Transaction not allowed at terminal",
    /* 59 */ "Suspected fraud",
    /* 60 */ "",
    /* 61 */ "Activity amount limit exceeded",
    /* 62 */ "Restricted card (for example, in Country Exclusion table)",
    /* 63 */ "Security violation",
    /* 64 */ "No User Found",
    /* 65 */ "Activity count limit exceeded",
    /* 66 */ "Wrong User ID",
    /* 67 */ "Wrong PIN",
    /* 68 */ "Wrong User Role",
    /* 69 */ "TERMINAL ID ERROR",
    /* 70 */ "User access denied",
    /* 71 */ "User(ID) does not exist",
    /* 72 */ "Wrong PIN(password)",
    /* 73 */ "Wrong User Role",
    /* 74 */ "Operator not tied to the agent",
    /* 75 */ "Allowable number of PIN-entry tries exceeded",
    /* 76 */ "Unable to locate previous message (no match on Retrieval Reference number)",
    /* 77 */ "Previous message located for a repeat or reversal, but repeat or reversal data are inconsistent with original message",
    /* 78 */ "Blocked, first used The transaction is from a new cardholder, and the card has not been properly unblocked.",
    /* 79 */ "",
    /* 80 */ "Visa transactions: credit issuer unavailable. Private label and check acceptance: Invalid date",
    /* 81 */ "PIN cryptographic error found (error found by VIC security module during PIN decryption)",
    /* 82 */ "Negative CAM, dCVV, iCVV, or CVV results",
    /* 83 */ "Unable to verify PIN",
    /* 84 */ "",
    /* 85 */ "No reason to decline a request for account number verification, address verification, CVV2 verification, or a credit voucher or merchandise return",
    /* 86 */ "",
    /* 87 */ "",
    /* 88 */ "",
    /* 89 */ "",
    /* 90 */ "SYSTEM ERROR",
    /* 91 */ "Issuer unavailable or switch inoperative (STIP not applicable or available for this transaction)",
    /* 92 */ "Destination cannot be found for routing",
    /* 93 */ "Transaction cannot be completed - violation of law",
    /* 94 */ "",
    /* 95 */ "Reconciliation failed",
    /* 96 */ "System malfunction, System malfunction or certain field error conditions",
    /* 97 */ "ISSUER/'HSM' OFFLINE",
    /* 98 */ "",
    /* 99 */ "FATAL ERROR",
];

/// Alpha extension codes used by the acquiring network.
const ALPHA_CODES: &[(&str, &str)] = &[
    ("B1", "Surcharge amount not permitted on Visa cards (U.S. acquirers only)"),
    ("N0", "Force STIP"),
    ("N3", "Cash service not available"),
    ("N4", "Cashback request exceeds issuer limit"),
    ("N7", "Decline for CVV2 failure"),
    ("P2", "Invalid biller information"),
    ("P5", "PIN Change/Unblock request declined"),
    ("P6", "Unsafe PIN"),
    ("Q1", "Card Authentication failed"),
    ("R0", "Stop Payment Order"),
    ("R1", "Revocation of Authorization Order"),
    ("R3", "Revocation of All Authorizations Order"),
    ("XA", "Forward to issuer"),
    ("XD", "Forward to issuer"),
    ("Z3", "Unable to go online"),
];

const SYSTEM_ERRORS: &[&str] = &[
    "06", "28", "45", "72", "73", "74", "90", "91", "92", "93", "94", "95", "96", "97", "98", "99",
];

const PIN_ERRORS: &[&str] = &["55", "62", "67", "72", "75", "81", "83"];

const SECURITY_ERRORS: &[&str] = &["59", "63", "75", "78", "80", "81", "82", "83", "84", "85"];

const CARD_ERRORS: &[&str] = &["04", "07", "33", "41", "43", "54", "56"];

const ACCOUNT_ERRORS: &[&str] = &["14", "18", "51", "52", "53", "61", "65"];

/// Narration for a POS response code.
pub fn describe(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "Unknown response code".to_string();
    }
    if let Ok(index) = code.parse::<usize>() {
        if index < DESCRIPTIONS.len() {
            let description = DESCRIPTIONS[index];
            if description.is_empty() {
                return format!("Reserved/Unused response code: {index:02}");
            }
            return description.to_string();
        }
        return format!("Invalid response code: {index}");
    }
    let upper = code.to_uppercase();
    ALPHA_CODES
        .iter()
        .find(|(alpha, _)| *alpha == upper)
        .map(|(_, description)| description.to_string())
        .unwrap_or_else(|| format!("Unknown response code: {code}"))
}

/// System/technical error family.
pub fn is_system_error(code: &str) -> bool {
    SYSTEM_ERRORS.contains(&code)
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
    if is_system_error(code) || SECURITY_ERRORS.contains(&code) {
        return Severity::Error;
    }
    Severity::Warn
}

/// Classification.
///
/// The code sets overlap (72 is both a system and a PIN code); precedence
/// is success, system, PIN, security, card, account, business.
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
    } else if SECURITY_ERRORS.contains(&code) {
        Category::SecurityError
    } else if CARD_ERRORS.contains(&code) {
        Category::CardError
    } else if ACCOUNT_ERRORS.contains(&code) {
        Category::AccountError
    } else {
        Category::BusinessError
    }
}

/// Full info record for a POS code.
pub fn info(code: &str) -> CodeInfo {
    CodeInfo {
        code: code.to_string(),
        description: describe(code),
        severity: severity(code),
        category: category(code),
        recommended_action: recommended_action(code).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(describe("00"), "APPROVED");
        assert_eq!(describe("14"), "Invalid account number (no such number)");
        assert_eq!(describe("61"), "Activity amount limit exceeded");
        assert_eq!(describe("97"), "ISSUER/'HSM' OFFLINE");
    }

    #[test]
    fn test_reserved_codes() {
        assert_eq!(describe("08"), "Reserved/Unused response code: 08");
        assert_eq!(describe("94"), "Reserved/Unused response code: 94");
    }

    #[test]
    fn test_alpha_codes() {
        assert_eq!(describe("Z3"), "Unable to go online");
        assert_eq!(describe("b1"), describe("B1"));
        assert!(describe("ZZ").starts_with("Unknown response code"));
    }

    #[test]
    fn test_severity_tiers() {
        assert_eq!(severity("00"), Severity::Info);
        assert_eq!(severity("91"), Severity::Error);
        assert_eq!(severity("63"), Severity::Error);
        assert_eq!(severity("51"), Severity::Warn);
        assert_eq!(severity(""), Severity::Error);
    }

    #[test]
    fn test_category_precedence() {
        assert_eq!(category("00"), Category::Success);
        // 72 is in both the system and PIN sets; system wins.
        assert_eq!(category("72"), Category::SystemError);
        assert_eq!(category("55"), Category::PinError);
        assert_eq!(category("59"), Category::SecurityError);
        assert_eq!(category("54"), Category::CardError);
        assert_eq!(category("51"), Category::AccountError);
        assert_eq!(category("05"), Category::BusinessError);
        assert_eq!(category(""), Category::Unknown);
    }

    #[test]
    fn test_normative_sets() {
        for code in ["06", "28", "45", "90", "91", "96", "99"] {
            assert!(is_system_error(code), "{code} should be a system error");
        }
        assert!(!is_system_error("61"));
    }
}
