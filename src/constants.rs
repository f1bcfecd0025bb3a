/// Operator identifiers and the document ids each one publishes.
/// Registry lookups are case-insensitive; these are the canonical spellings.

// Operator identifiers
pub const ERCOT_ID: &str = "ERCOT";
pub const MISO_ID: &str = "MISO";

// Balancing-authority names written into records
pub const ERCOT_BA_NAME: &str = "ERCOT";
pub const MISO_BA_NAME: &str = "MISO";

// ERCOT documents
pub const ERCOT_RTM_DOC: &str = "ercot:rtm";
pub const ERCOT_LOAD_7DAY_DOC: &str = "ercot:report:load_7day";
pub const ERCOT_WIND_HRLY_DOC: &str = "ercot:report:wind_hrly";
pub const ERCOT_GEN_HRLY_DOC: &str = "ercot:report:gen_hrly";

// MISO documents
pub const MISO_FUEL_MIX_DOC: &str = "miso:fuel_mix";

/// Canonical spelling of an operator id typed by a user, if it is known.
pub fn canonical_source_id(id: &str) -> Option<&'static str> {
    [ERCOT_ID, MISO_ID]
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_source_id() {
        assert_eq!(canonical_source_id("ercot"), Some(ERCOT_ID));
        assert_eq!(canonical_source_id(" Miso "), Some(MISO_ID));
        assert_eq!(canonical_source_id("caiso"), None);
    }
}
