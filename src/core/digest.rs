use crate::core::days::day_name;
use crate::models::{CenterSlots, Slot};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

/// Heading shown at the top of every digest
pub const DIGEST_HEADING: &str = "Road Test Availability";

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

/// Rendered digest in both mail formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub html: String,
    pub text: String,
}

#[derive(Serialize)]
struct GroupView {
    center: String,
    slots: Vec<String>,
}

/// Digest renderer
///
/// Templates are embedded at compile time. The `.html` template is
/// autoescaped, so center names never need manual escaping.
pub struct DigestRenderer {
    engine: Tera,
}

impl DigestRenderer {
    pub fn new() -> Result<Self, DigestError> {
        let mut engine = Tera::default();

        engine.add_raw_templates(vec![
            ("digest.html", include_str!("../../templates/digest.html")),
            ("digest.txt", include_str!("../../templates/digest.txt")),
        ])?;

        Ok(Self { engine })
    }

    /// Render matched slots as an email body
    ///
    /// Centers with no slots are left out. Groups and slots are rendered in
    /// the order given.
    pub fn render(&self, groups: &[CenterSlots]) -> Result<Digest, DigestError> {
        let views: Vec<GroupView> = groups
            .iter()
            .filter(|g| !g.slots.is_empty())
            .map(|g| GroupView {
                center: g.center.name.clone(),
                slots: g.slots.iter().map(slot_line).collect(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("heading", DIGEST_HEADING);
        context.insert("groups", &views);

        Ok(Digest {
            html: self.engine.render("digest.html", &context)?,
            text: self.engine.render("digest.txt", &context)?,
        })
    }
}

/// `2024-06-10 (Monday) - 09:00–09:35`
pub fn slot_line(slot: &Slot) -> String {
    format!(
        "{} ({}) - {}\u{2013}{}",
        slot.date.format("%Y-%m-%d"),
        day_name(slot.day_of_week),
        slot.start_time.format("%H:%M"),
        slot.end_time.format("%H:%M"),
    )
}
