//! Renewal Form Validation
//!
//! Two-phase validation of the submitted renewal form. Phase one is
//! syntactic and touches no I/O: trim every field, require the mandatory
//! ones, normalize the checkboxes, parse the donations. Phase two resolves
//! the members against the store. Both phases accumulate per-field
//! messages which the form template shows verbatim beside each field.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::store::{MembershipStore, StoreError};

// ============================================================================
// Canonical Messages
// ============================================================================

/// Shown beside each mandatory field on the first visit, before anything
/// has been typed.
pub const FIRST_VISIT_MARKER: &str = "*";

pub const MSG_FIRST_NAME_MISSING: &str = "You must fill in the first name";
pub const MSG_LAST_NAME_MISSING: &str = "You must fill in the last name";
pub const MSG_EMAIL_MISSING: &str = "You must fill in the email address";
pub const MSG_ASSOC_FIRST_NAME_MISSING: &str =
    "If you fill in anything in this section, you must fill in the first name";
pub const MSG_ASSOC_LAST_NAME_MISSING: &str =
    "If you fill in anything in this section, you must fill in the last name";
pub const MSG_INVALID_NUMBER: &str = "must be a number";
pub const MSG_NO_SUCH_MEMBER: &str = "cannot find this member";

// ============================================================================
// Checkbox Normalization
// ============================================================================

/// True when a submitted checkbox value counts as ticked. Browsers post
/// "on"; "checked" is accepted for hand-written clients. Case-sensitive.
pub fn is_checked(raw: &str) -> bool {
    raw == "on" || raw == "checked"
}

/// Canonical value written back into the form for re-rendering.
pub fn normalize_checkbox(raw: &str) -> &'static str {
    if is_checked(raw) { "on" } else { "off" }
}

// ============================================================================
// Form Carriers
// ============================================================================

/// Raw form fields exactly as posted. Absent fields deserialize to empty
/// strings, so one struct covers the first visit and every re-submission.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    /// Friend-of-the-museum checkbox for the full member.
    #[serde(default)]
    pub friend: String,

    #[serde(default)]
    pub assoc_first_name: String,

    #[serde(default)]
    pub assoc_last_name: String,

    #[serde(default)]
    pub assoc_email: String,

    /// Friend-of-the-museum checkbox for the associate member.
    #[serde(default)]
    pub assoc_friend: String,

    #[serde(default)]
    pub donation_to_society: String,

    #[serde(default)]
    pub donation_to_museum: String,
}

impl FormInput {
    fn all_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.friend,
            &self.assoc_first_name,
            &self.assoc_last_name,
            &self.assoc_email,
            &self.assoc_friend,
            &self.donation_to_society,
            &self.donation_to_museum,
        ]
        .iter()
        .all(|field| field.is_empty())
    }

    fn trim_all(&mut self) {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.friend,
            &mut self.assoc_first_name,
            &mut self.assoc_last_name,
            &mut self.assoc_email,
            &mut self.assoc_friend,
            &mut self.donation_to_society,
            &mut self.donation_to_museum,
        ] {
            *field = field.trim().to_string();
        }
    }
}

/// One message slot per form field; empty means no message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub assoc_first_name: String,
    pub assoc_last_name: String,
    pub assoc_email: String,
    pub donation_to_society: String,
    pub donation_to_museum: String,
}

impl FieldErrors {
    /// True when no field carries a message.
    pub fn is_clear(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.assoc_first_name,
            &self.assoc_last_name,
            &self.assoc_email,
            &self.donation_to_society,
            &self.donation_to_museum,
        ]
        .iter()
        .all(|message| message.is_empty())
    }
}

/// Outcome of validation: trimmed field values for re-rendering, per-field
/// messages, and the typed values the rest of the renewal flow consumes.
#[derive(Clone, Debug)]
pub struct RenewalForm {
    /// Trimmed values, checkboxes written back as "on"/"off".
    pub fields: FormInput,

    pub errors: FieldErrors,

    /// False as soon as any message is attached.
    pub valid: bool,

    /// Whether anything in the associate section was filled in.
    pub has_associate: bool,

    pub friend: bool,

    pub assoc_friend: bool,

    pub donation_to_society: Decimal,

    pub donation_to_museum: Decimal,

    /// Resolved by phase two; 0 until then.
    pub full_member_id: i64,

    /// Resolved by phase two; 0 when absent or unresolved.
    pub associate_member_id: i64,
}

impl RenewalForm {
    /// Phase one: syntactic checks, no I/O.
    ///
    /// An entirely empty submission is the first visit: the mandatory
    /// fields get the [`FIRST_VISIT_MARKER`] and nothing else is checked.
    pub fn validate(mut input: FormInput) -> Self {
        let mut errors = FieldErrors::default();

        if input.all_empty() {
            errors.first_name = FIRST_VISIT_MARKER.into();
            errors.last_name = FIRST_VISIT_MARKER.into();
            errors.email = FIRST_VISIT_MARKER.into();
            return Self {
                fields: input,
                errors,
                valid: false,
                has_associate: false,
                friend: false,
                assoc_friend: false,
                donation_to_society: Decimal::ZERO,
                donation_to_museum: Decimal::ZERO,
                full_member_id: 0,
                associate_member_id: 0,
            };
        }

        input.trim_all();

        if input.first_name.is_empty() {
            errors.first_name = MSG_FIRST_NAME_MISSING.into();
        }
        if input.last_name.is_empty() {
            errors.last_name = MSG_LAST_NAME_MISSING.into();
        }
        if input.email.is_empty() {
            errors.email = MSG_EMAIL_MISSING.into();
        }

        // Decided before normalization turns an empty checkbox into "off".
        let has_associate = !input.assoc_first_name.is_empty()
            || !input.assoc_last_name.is_empty()
            || !input.assoc_email.is_empty()
            || !input.assoc_friend.is_empty();

        let friend = is_checked(&input.friend);
        let assoc_friend = is_checked(&input.assoc_friend);
        input.friend = normalize_checkbox(&input.friend).into();
        input.assoc_friend = normalize_checkbox(&input.assoc_friend).into();

        if has_associate {
            if input.assoc_first_name.is_empty() {
                errors.assoc_first_name = MSG_ASSOC_FIRST_NAME_MISSING.into();
            }
            if input.assoc_last_name.is_empty() {
                errors.assoc_last_name = MSG_ASSOC_LAST_NAME_MISSING.into();
            }
        }

        let donation_to_society =
            parse_donation(&input.donation_to_society, &mut errors.donation_to_society);
        let donation_to_museum =
            parse_donation(&input.donation_to_museum, &mut errors.donation_to_museum);

        let valid = errors.is_clear();
        Self {
            fields: input,
            errors,
            valid,
            has_associate,
            friend,
            assoc_friend,
            donation_to_society,
            donation_to_museum,
            full_member_id: 0,
            associate_member_id: 0,
        }
    }

    /// Phase two: resolve member ids from the store.
    ///
    /// Only meaningful after phase one passed. A lookup miss becomes a
    /// field message and clears `valid`; a store backend failure
    /// propagates as an error instead.
    pub async fn resolve_members(
        &mut self,
        store: &dyn MembershipStore,
    ) -> Result<bool, StoreError> {
        if !self.valid {
            return Ok(false);
        }

        match store
            .find_member(
                &self.fields.first_name,
                &self.fields.last_name,
                &self.fields.email,
            )
            .await
        {
            Ok(member_id) => self.full_member_id = member_id,
            Err(StoreError::MemberNotFound) => {
                self.errors.first_name = MSG_NO_SUCH_MEMBER.into();
                self.errors.last_name = MSG_NO_SUCH_MEMBER.into();
                self.errors.email = MSG_NO_SUCH_MEMBER.into();
                self.valid = false;
            }
            Err(err) => return Err(err),
        }

        if self.has_associate {
            // The associate email may legitimately be empty; the triple is
            // looked up with whatever was submitted.
            match store
                .find_member(
                    &self.fields.assoc_first_name,
                    &self.fields.assoc_last_name,
                    &self.fields.assoc_email,
                )
                .await
            {
                Ok(member_id) => self.associate_member_id = member_id,
                Err(StoreError::MemberNotFound) => {
                    self.errors.assoc_first_name = MSG_NO_SUCH_MEMBER.into();
                    self.errors.assoc_last_name = MSG_NO_SUCH_MEMBER.into();
                    self.errors.assoc_email = MSG_NO_SUCH_MEMBER.into();
                    self.valid = false;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(self.valid)
    }
}

// An empty donation is an error, not a zero default; negative amounts get
// the same message.
fn parse_donation(raw: &str, message: &mut String) -> Decimal {
    match raw.parse::<Decimal>() {
        Ok(amount) if !amount.is_sign_negative() => amount,
        _ => {
            *message = MSG_INVALID_NUMBER.into();
            Decimal::ZERO
        }
    }
}
