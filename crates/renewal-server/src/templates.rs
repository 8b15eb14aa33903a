//! HTML Templates
//!
//! Compiled-in pages with `{{slot}}` placeholders, parsed once at startup.
//! Every member-supplied value is HTML-escaped on the way in; only markup
//! built by the renderers themselves goes in raw.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use renewal_core::{CostBreakdown, MembershipSale, RenewalForm};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {name}: unclosed {{{{ at byte {at}")]
    Unclosed { name: &'static str, at: usize },

    #[error("template {name}: malformed slot at byte {at}")]
    BadSlot { name: &'static str, at: usize },

    #[error("template {name}: no value for slot {slot:?}")]
    MissingValue { name: &'static str, slot: String },
}

// ============================================================================
// Template Engine
// ============================================================================

#[derive(Debug)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// One parsed page. Rendering is a straight walk over the segments.
#[derive(Debug)]
struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    fn parse(name: &'static str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::Unclosed {
                    name,
                    at: offset + start,
                });
            };
            let slot = after[..end].trim();
            let well_formed = !slot.is_empty()
                && slot
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !well_formed {
                return Err(TemplateError::BadSlot {
                    name,
                    at: offset + start,
                });
            }
            segments.push(Segment::Slot(slot.to_string()));
            offset += start + end + 4;
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    fn render(&self, values: &Values) -> Result<String, TemplateError> {
        let mut page = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => page.push_str(text),
                Segment::Slot(slot) => match values.get(slot) {
                    Some(value) => page.push_str(value),
                    None => {
                        return Err(TemplateError::MissingValue {
                            name: self.name,
                            slot: slot.clone(),
                        });
                    }
                },
            }
        }
        Ok(page)
    }
}

/// Slot values for one render. `set` escapes; `set_raw` is for markup the
/// renderer built itself.
#[derive(Default)]
struct Values {
    slots: HashMap<String, String>,
}

impl Values {
    fn new() -> Self {
        Self::default()
    }

    fn set(mut self, slot: &str, value: impl AsRef<str>) -> Self {
        self.slots
            .insert(slot.to_string(), html_escape(value.as_ref()));
        self
    }

    fn set_raw(mut self, slot: &str, value: impl Into<String>) -> Self {
        self.slots.insert(slot.to_string(), value.into());
        self
    }

    fn get(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }
}

// ============================================================================
// Registry and Renderers
// ============================================================================

/// The five pages of the renewal flow, parsed from the sources compiled
/// into the binary.
pub struct TemplateRegistry {
    form: Template,
    breakdown: Template,
    receipt: Template,
    cancelled: Template,
    error: Template,
}

impl TemplateRegistry {
    pub fn load() -> Result<Self, TemplateError> {
        Ok(Self {
            form: Template::parse("form", include_str!("../templates/form.html"))?,
            breakdown: Template::parse(
                "breakdown",
                include_str!("../templates/breakdown.html"),
            )?,
            receipt: Template::parse("receipt", include_str!("../templates/receipt.html"))?,
            cancelled: Template::parse(
                "cancelled",
                include_str!("../templates/cancelled.html"),
            )?,
            error: Template::parse("error", include_str!("../templates/error.html"))?,
        })
    }

    /// The renewal form, blank or re-rendered with the member's values and
    /// the message beside each offending field.
    pub fn render_form(&self, form: &RenewalForm) -> Result<String, TemplateError> {
        let values = Values::new()
            .set("first_name", &form.fields.first_name)
            .set("first_name_error", &form.errors.first_name)
            .set("last_name", &form.fields.last_name)
            .set("last_name_error", &form.errors.last_name)
            .set("email", &form.fields.email)
            .set("email_error", &form.errors.email)
            .set_raw("friend_checked", checked_attr(form.friend))
            .set("assoc_first_name", &form.fields.assoc_first_name)
            .set("assoc_first_name_error", &form.errors.assoc_first_name)
            .set("assoc_last_name", &form.fields.assoc_last_name)
            .set("assoc_last_name_error", &form.errors.assoc_last_name)
            .set("assoc_email", &form.fields.assoc_email)
            .set("assoc_email_error", &form.errors.assoc_email)
            .set_raw("assoc_friend_checked", checked_attr(form.assoc_friend))
            .set("donation_to_society", &form.fields.donation_to_society)
            .set(
                "donation_to_society_error",
                &form.errors.donation_to_society,
            )
            .set("donation_to_museum", &form.fields.donation_to_museum)
            .set("donation_to_museum_error", &form.errors.donation_to_museum);
        self.form.render(&values)
    }

    /// The confirmation page: itemized costs, total, and the checkout form
    /// whose hidden fields re-state the sale.
    pub fn render_breakdown(
        &self,
        sale: &MembershipSale,
        breakdown: &CostBreakdown,
    ) -> Result<String, TemplateError> {
        let values = Values::new()
            .set_raw("cost_rows", cost_rows(breakdown))
            .set("total", money(breakdown.total))
            .set_raw("hidden_fields", hidden_fields(sale));
        self.breakdown.render(&values)
    }

    /// The receipt shown after a completed payment.
    pub fn render_receipt(&self, sale: &MembershipSale) -> Result<String, TemplateError> {
        let breakdown = CostBreakdown::for_sale(sale);
        let values = Values::new()
            .set("membership_year", sale.membership_year.to_string())
            .set_raw("cost_rows", cost_rows(&breakdown))
            .set("total", money(breakdown.total))
            .set("payment_reference", &sale.payment_session_id);
        self.receipt.render(&values)
    }

    pub fn render_cancelled(&self) -> Result<String, TemplateError> {
        self.cancelled.render(&Values::new())
    }

    /// The error page. Infallible: if even this template cannot render,
    /// a hardcoded page goes out instead.
    pub fn render_error(&self, message: &str) -> String {
        let values = Values::new().set("message", message);
        self.error
            .render(&values)
            .unwrap_or_else(|_| fallback_error_page(message))
    }
}

// ============================================================================
// Markup Helpers
// ============================================================================

/// Two-decimal display form of a pound amount.
fn money(amount: Decimal) -> String {
    format!("{amount:.2}")
}

fn checked_attr(ticked: bool) -> &'static str {
    if ticked { "checked" } else { "" }
}

fn cost_rows(breakdown: &CostBreakdown) -> String {
    let mut rows = String::new();
    for line in &breakdown.lines {
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"amount\">&pound;{}</td></tr>\n",
            html_escape(line.label),
            money(line.amount)
        ));
    }
    rows
}

/// Hidden inputs carrying the confirmed sale into the checkout POST. Only
/// what was actually charged is emitted; the checkout handler treats an
/// absent field as its zero value.
fn hidden_fields(sale: &MembershipSale) -> String {
    let mut fields = String::new();
    push_hidden(&mut fields, "user_id", &sale.full_member_id.to_string());
    if sale.full_member_is_friend {
        push_hidden(&mut fields, "friend", "on");
    }
    if sale.has_associate() {
        push_hidden(
            &mut fields,
            "assoc_user_id",
            &sale.associate_member_id.to_string(),
        );
        if sale.associate_member_is_friend {
            push_hidden(&mut fields, "assoc_friend", "on");
        }
    }
    if sale.donation_to_society > Decimal::ZERO {
        push_hidden(
            &mut fields,
            "donation_to_society",
            &money(sale.donation_to_society),
        );
    }
    if sale.donation_to_museum > Decimal::ZERO {
        push_hidden(
            &mut fields,
            "donation_to_museum",
            &money(sale.donation_to_museum),
        );
    }
    fields
}

fn push_hidden(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!(
        "<input type=\"hidden\" name=\"{name}\" value=\"{}\">\n",
        html_escape(value)
    ));
}

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn fallback_error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Something went wrong</title></head>\
         <body><h1>Something went wrong</h1><p>{}</p></body></html>",
        html_escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use renewal_core::{FeeCatalog, FormInput};
    use rust_decimal_macros::dec;

    fn fees() -> FeeCatalog {
        FeeCatalog {
            ordinary: dec!(24.00),
            associate: dec!(6.00),
            friend: dec!(5.00),
        }
    }

    fn family_sale() -> MembershipSale {
        MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            true,
            Some((77, false)),
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        )
    }

    #[test]
    fn test_parse_and_render() {
        let template = Template::parse("t", "a {{x}} b {{ y }} c").unwrap();
        let page = template
            .render(&Values::new().set("x", "1").set("y", "2"))
            .unwrap();
        assert_eq!(page, "a 1 b 2 c");
    }

    #[test]
    fn test_parse_rejects_unclosed_slot() {
        let err = Template::parse("t", "a {{x b").unwrap_err();
        assert!(matches!(err, TemplateError::Unclosed { name: "t", at: 2 }));
    }

    #[test]
    fn test_parse_rejects_malformed_slot() {
        for source in ["{{}}", "{{a b}}", "{{a-b}}"] {
            let err = Template::parse("t", source).unwrap_err();
            assert!(matches!(err, TemplateError::BadSlot { .. }), "{source}");
        }
    }

    #[test]
    fn test_render_missing_value() {
        let template = Template::parse("t", "{{x}}").unwrap();
        let err = template.render(&Values::new()).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MissingValue { name: "t", ref slot } if slot == "x"
        ));
    }

    #[test]
    fn test_set_escapes_values() {
        let template = Template::parse("t", "{{x}}").unwrap();
        let page = template
            .render(&Values::new().set("x", "<b>\"&'</b>"))
            .unwrap();
        assert_eq!(page, "&lt;b&gt;&quot;&amp;&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_registry_loads() {
        assert!(TemplateRegistry::load().is_ok());
    }

    #[test]
    fn test_first_visit_form_shows_markers() {
        let registry = TemplateRegistry::load().unwrap();
        let form = RenewalForm::validate(FormInput::default());
        let page = registry.render_form(&form).unwrap();

        assert_eq!(page.matches("<span class=\"error\">*</span>").count(), 3);
        assert!(!page.contains("checked"));
    }

    #[test]
    fn test_form_escapes_member_input() {
        let registry = TemplateRegistry::load().unwrap();
        let form = RenewalForm::validate(FormInput {
            first_name: "<script>alert(1)</script>".into(),
            last_name: "b".into(),
            email: "a@b.com".into(),
            donation_to_society: "0".into(),
            donation_to_museum: "0".into(),
            ..FormInput::default()
        });
        let page = registry.render_form(&form).unwrap();

        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_breakdown_rows_and_hidden_fields() {
        let registry = TemplateRegistry::load().unwrap();
        let sale = family_sale();
        let breakdown = CostBreakdown::for_sale(&sale);
        let page = registry.render_breakdown(&sale, &breakdown).unwrap();

        assert!(page.contains("Ordinary membership"));
        assert!(page.contains("Friend of the museum"));
        assert!(page.contains("Associate membership"));
        assert!(page.contains("&pound;35.00"));
        assert!(page.contains("name=\"user_id\" value=\"42\""));
        assert!(page.contains("name=\"friend\" value=\"on\""));
        assert!(page.contains("name=\"assoc_user_id\" value=\"77\""));
        assert!(!page.contains("name=\"assoc_friend\""));
        assert!(!page.contains("name=\"donation_to_society\""));
    }

    #[test]
    fn test_hidden_fields_include_positive_donations() {
        let sale = MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            false,
            None,
            dec!(1.5),
            Decimal::ZERO,
            "Stripe",
        );
        let fields = hidden_fields(&sale);

        assert!(fields.contains("name=\"donation_to_society\" value=\"1.50\""));
        assert!(!fields.contains("name=\"donation_to_museum\""));
        assert!(!fields.contains("name=\"friend\""));
        assert!(!fields.contains("name=\"assoc_user_id\""));
    }

    #[test]
    fn test_receipt_carries_reference_and_year() {
        let registry = TemplateRegistry::load().unwrap();
        let mut sale = family_sale();
        sale.payment_session_id = "cs_test_9".into();
        let page = registry.render_receipt(&sale).unwrap();

        assert!(page.contains("2025"));
        assert!(page.contains("cs_test_9"));
        assert!(page.contains("&pound;35.00"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let registry = TemplateRegistry::load().unwrap();
        let page = registry.render_error("<oops>");
        assert!(page.contains("&lt;oops&gt;"));
    }

    #[test]
    fn test_fallback_error_page_escapes() {
        let page = fallback_error_page("<oops>");
        assert!(page.contains("&lt;oops&gt;"));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_money_always_two_decimals() {
        assert_eq!(money(dec!(5)), "5.00");
        assert_eq!(money(dec!(33.5)), "33.50");
        assert_eq!(money(Decimal::ZERO), "0.00");
    }
}
