//! Input records handed to the calculators by the data-access layer.
//!
//! Field names serialise in camelCase so CRM exports load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of BDR action recorded in an activity log.
///
/// Matching is exact and case-sensitive. Anything not listed is kept as
/// `Unknown` with the raw text, and no calculator counts it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    CallCompleted,
    ProposalSent,
    AgreementSent,
    AgreementSigned,
    PartnerListSent,
    Unknown(String),
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::CallCompleted => "Call_Completed",
            ActivityType::ProposalSent => "Proposal_Sent",
            ActivityType::AgreementSent => "Agreement_Sent",
            ActivityType::AgreementSigned => "Agreement_Signed",
            ActivityType::PartnerListSent => "Partner_List_Sent",
            ActivityType::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActivityType::Unknown(_))
    }
}

impl From<&str> for ActivityType {
    fn from(s: &str) -> Self {
        match s {
            "Call_Completed" => ActivityType::CallCompleted,
            "Proposal_Sent" => ActivityType::ProposalSent,
            "Agreement_Sent" => ActivityType::AgreementSent,
            "Agreement_Signed" => ActivityType::AgreementSigned,
            "Partner_List_Sent" => ActivityType::PartnerListSent,
            other => ActivityType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ActivityType {
    fn from(s: String) -> Self {
        ActivityType::from(s.as_str())
    }
}

impl From<ActivityType> for String {
    fn from(t: ActivityType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of a deal in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineStatus {
    Call,
    Proposal,
    Agreement,
    ListOut,
    Sold,
    Lost,
    Other(String),
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineStatus::Call => "Call",
            PipelineStatus::Proposal => "Proposal",
            PipelineStatus::Agreement => "Agreement",
            PipelineStatus::ListOut => "List Out",
            PipelineStatus::Sold => "Sold",
            PipelineStatus::Lost => "Lost",
            PipelineStatus::Other(raw) => raw,
        }
    }

    /// Still being worked: neither sold nor lost.
    pub fn is_open(&self) -> bool {
        !matches!(self, PipelineStatus::Sold | PipelineStatus::Lost)
    }
}

impl From<&str> for PipelineStatus {
    fn from(s: &str) -> Self {
        match s {
            "Call" => PipelineStatus::Call,
            "Proposal" => PipelineStatus::Proposal,
            "Agreement" => PipelineStatus::Agreement,
            "List Out" => PipelineStatus::ListOut,
            "Sold" => PipelineStatus::Sold,
            "Lost" => PipelineStatus::Lost,
            other => PipelineStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for PipelineStatus {
    fn from(s: String) -> Self {
        PipelineStatus::from(s.as_str())
    }
}

impl From<PipelineStatus> for String {
    fn from(s: PipelineStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deal in progress. Never a source of sale or revenue figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineItem {
    #[serde(default)]
    pub id: Option<String>,
    pub status: PipelineStatus,
    pub bdr: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    pub bdr: String,
}

/// One booked sale. The only record that says a sale happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceEntry {
    pub bdr: String,
    /// A missing or null amount counts as zero revenue but still counts
    /// as a sale. Read it through [`FinanceEntry::amount`].
    #[serde(default)]
    pub gbp_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub month: String,
}

impl FinanceEntry {
    pub fn amount(&self) -> f64 {
        self.gbp_amount.unwrap_or(0.0)
    }
}

/// Goal values for the three tracked KPIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Targets {
    pub steady_call_volume: f64,
    pub agreement_rate: f64,
    pub lists_out: f64,
}

/// Sum of amounts, null counted as zero.
pub fn total_amount<'a>(entries: impl IntoIterator<Item = &'a FinanceEntry>) -> f64 {
    entries.into_iter().map(FinanceEntry::amount).sum()
}
