//! Display rules for audit schedule affordances.
//!
//! Each [ItemType] has a [ControlRule] of three predicates over the
//! surrounding schedule, organization and visit. Predicates that cannot be
//! evaluated fall back to visible but disabled and read-only.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::document::models::Identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ScheduleStatus {
    Ongoing,
    Closed,
    Cancelled,
}

impl TryFrom<u8> for ScheduleStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ongoing),
            1 => Ok(Self::Closed),
            2 => Ok(Self::Cancelled),
            other => Err(format!("invalid schedule status: {other}")),
        }
    }
}

impl From<ScheduleStatus> for u8 {
    fn from(value: ScheduleStatus) -> Self {
        match value {
            ScheduleStatus::Ongoing => 0,
            ScheduleStatus::Closed => 1,
            ScheduleStatus::Cancelled => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrganizationStatus {
    Pending,
    Ongoing,
    Completed,
}

impl TryFrom<u8> for OrganizationStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Ongoing),
            2 => Ok(Self::Completed),
            other => Err(format!("invalid organization status: {other}")),
        }
    }
}

impl From<OrganizationStatus> for u8 {
    fn from(value: OrganizationStatus) -> Self {
        match value {
            OrganizationStatus::Pending => 0,
            OrganizationStatus::Ongoing => 1,
            OrganizationStatus::Completed => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VisitStatus {
    Scheduled,
    Ongoing,
    Completed,
}

impl TryFrom<u8> for VisitStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Scheduled),
            1 => Ok(Self::Ongoing),
            2 => Ok(Self::Completed),
            other => Err(format!("invalid visit status: {other}")),
        }
    }
}

impl From<VisitStatus> for u8 {
    fn from(value: VisitStatus) -> Self {
        match value {
            VisitStatus::Scheduled => 0,
            VisitStatus::Ongoing => 1,
            VisitStatus::Completed => 2,
        }
    }
}

/// Decode a status code without failing the surrounding context.
fn lenient_status<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u8>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|code| u8::try_from(code).ok())
        .and_then(|code| T::try_from(code).ok()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSchedule {
    #[serde(default)]
    pub id: Option<Identifier>,

    /// `None` when absent or not a known code. Rules reading it fail safe.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<ScheduleStatus>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: Option<Identifier>,

    /// `None` when absent or not a known code. Rules reading it fail safe.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<OrganizationStatus>,

    #[serde(default)]
    pub verdict: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(default)]
    pub id: Option<Identifier>,

    /// `None` when absent or not a known code. Rules reading it fail safe.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<VisitStatus>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Read model the rules are evaluated against. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiControlContext {
    #[serde(default)]
    pub audit_schedule: Option<AuditSchedule>,

    #[serde(default)]
    pub organization: Option<Organization>,

    #[serde(default)]
    pub visit: Option<Visit>,

    #[serde(default)]
    pub item_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiControlState {
    pub visible: bool,
    pub enabled: bool,
    pub editable: bool,
    pub read_only: bool,
}

impl UiControlState {
    fn new(visible: bool, enabled: bool, editable: bool) -> Self {
        Self {
            visible,
            enabled,
            editable,
            read_only: !editable,
        }
    }

    /// Used when there is no schedule for any rule to apply to.
    pub fn permissive() -> Self {
        Self::new(true, true, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    General,
    ScheduleDetails,
    OrganizationList,
    OrganizationDetails,
    VisitDetails,
    DocumentUpload,
    Verdict,
}

impl ItemType {
    const KEYS: [(&'static str, ItemType); 7] = [
        ("general", ItemType::General),
        ("schedule_details", ItemType::ScheduleDetails),
        ("organization_list", ItemType::OrganizationList),
        ("organization_details", ItemType::OrganizationDetails),
        ("visit_details", ItemType::VisitDetails),
        ("document_upload", ItemType::DocumentUpload),
        ("verdict", ItemType::Verdict),
    ];

    /// Look up an item type by key. Unknown keys fall back to [ItemType::General].
    pub fn from_key(key: &str) -> Self {
        match Self::KEYS.iter().find(|(k, _)| *k == key) {
            Some((_, item)) => *item,
            None => {
                warn!("Unknown item type '{key}', using general rules");
                ItemType::General
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule requires an organization")]
    MissingOrganization,

    #[error("rule requires a visit")]
    MissingVisit,

    #[error("{0} status is missing or unknown")]
    UnknownStatus(&'static str),
}

/// What a rule sees: the context with its schedule guaranteed present.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub schedule: &'a AuditSchedule,
    pub organization: Option<&'a Organization>,
    pub visit: Option<&'a Visit>,
}

impl<'a> RuleInput<'a> {
    fn schedule_open(&self) -> Result<bool, RuleError> {
        let status = self.schedule.status.ok_or(RuleError::UnknownStatus("schedule"))?;
        Ok(status == ScheduleStatus::Ongoing)
    }

    fn organization(&self) -> Result<&'a Organization, RuleError> {
        self.organization.ok_or(RuleError::MissingOrganization)
    }

    fn visit(&self) -> Result<&'a Visit, RuleError> {
        self.visit.ok_or(RuleError::MissingVisit)
    }

    fn organization_status(&self) -> Result<OrganizationStatus, RuleError> {
        self.organization()?
            .status
            .ok_or(RuleError::UnknownStatus("organization"))
    }

    fn visit_status(&self) -> Result<VisitStatus, RuleError> {
        self.visit()?.status.ok_or(RuleError::UnknownStatus("visit"))
    }
}

pub type Predicate = fn(&RuleInput<'_>) -> Result<bool, RuleError>;

#[derive(Clone, Copy)]
pub struct ControlRule {
    pub visible: Predicate,
    pub enabled: Predicate,
    pub editable: Predicate,
}

impl ControlRule {
    pub fn for_item(item: ItemType) -> Self {
        match item {
            ItemType::General | ItemType::ScheduleDetails | ItemType::OrganizationList => Self {
                visible: always,
                enabled: schedule_open,
                editable: schedule_open,
            },
            ItemType::OrganizationDetails => Self {
                visible: |input| Ok(input.organization.is_some()),
                enabled: organization_open,
                editable: organization_open,
            },
            ItemType::VisitDetails => Self {
                visible: |input| Ok(input.visit.is_some()),
                enabled: visit_open,
                editable: visit_open,
            },
            ItemType::DocumentUpload => Self {
                visible: always,
                enabled: organization_in_progress,
                editable: organization_in_progress,
            },
            ItemType::Verdict => Self {
                visible: |input| match input.organization {
                    Some(_) => Ok(input.organization_status()? != OrganizationStatus::Pending),
                    None => Ok(false),
                },
                enabled: organization_in_progress,
                editable: |input| {
                    Ok(organization_in_progress(input)? && input.organization()?.verdict.is_none())
                },
            },
        }
    }
}

fn always(_: &RuleInput<'_>) -> Result<bool, RuleError> {
    Ok(true)
}

fn schedule_open(input: &RuleInput<'_>) -> Result<bool, RuleError> {
    input.schedule_open()
}

fn organization_open(input: &RuleInput<'_>) -> Result<bool, RuleError> {
    let status = input.organization_status()?;
    Ok(input.schedule_open()? && status != OrganizationStatus::Completed)
}

fn organization_in_progress(input: &RuleInput<'_>) -> Result<bool, RuleError> {
    let status = input.organization_status()?;
    Ok(input.schedule_open()? && status == OrganizationStatus::Ongoing)
}

fn visit_open(input: &RuleInput<'_>) -> Result<bool, RuleError> {
    let status = input.visit_status()?;
    Ok(organization_open(input)? && status != VisitStatus::Completed)
}

fn evaluate(
    flag: &str,
    item: ItemType,
    predicate: Predicate,
    input: &RuleInput<'_>,
    fallback: bool,
) -> bool {
    predicate(input).unwrap_or_else(|e| {
        warn!("{item:?} {flag} rule failed ({e}), defaulting to {fallback}");
        fallback
    })
}

/// Resolve the display flags for the context's item type.
pub fn resolve_controls(context: &UiControlContext) -> UiControlState {
    let Some(schedule) = context.audit_schedule.as_ref() else {
        return UiControlState::permissive();
    };

    let item = ItemType::from_key(&context.item_type);
    let rule = ControlRule::for_item(item);

    let input = RuleInput {
        schedule,
        organization: context.organization.as_ref(),
        visit: context.visit.as_ref(),
    };

    UiControlState::new(
        evaluate("visible", item, rule.visible, &input, true),
        evaluate("enabled", item, rule.enabled, &input, false),
        evaluate("editable", item, rule.editable, &input, false),
    )
}
