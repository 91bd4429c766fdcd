//! Read-only aggregations over a scanned set of leads.
//!
//! The handlers narrow the scan with a [`LeadFilter`] before calling into
//! these; each function still applies its own predicate so it is correct on
//! any input.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::agents::UNKNOWN_AGENT;
use crate::id::ObjectId;
use crate::leads::{ExpandedLead, Lead, LeadFilter, LeadStatus, StatusFilter};

/// Length of the trailing window for the closed-last-week report.
pub const CLOSED_WINDOW_DAYS: i64 = 7;

/// Lead counts keyed by status. Only statuses that occur are present.
pub type StatusCounts = BTreeMap<LeadStatus, u64>;

pub fn closed_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(CLOSED_WINDOW_DAYS)
}

/// Scan filter for the closed-last-week report.
pub fn closed_last_week_filter(now: DateTime<Utc>) -> LeadFilter {
    LeadFilter {
        status: Some(StatusFilter::Is(LeadStatus::Closed)),
        closed_since: Some(closed_window_start(now)),
        ..Default::default()
    }
}

/// Scan filter for the pipeline summary: everything not yet closed.
pub fn pipeline_filter() -> LeadFilter {
    LeadFilter {
        status: Some(StatusFilter::IsNot(LeadStatus::Closed)),
        ..Default::default()
    }
}

/// Scan filter for the closed-by-agent report.
pub fn closed_filter() -> LeadFilter {
    LeadFilter {
        status: Some(StatusFilter::Is(LeadStatus::Closed)),
        ..Default::default()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosedLeadEntry {
    pub id: ObjectId,
    pub name: String,
    /// Agent name, or "Unknown"
    pub sales_agent: String,
    pub closed_at: DateTime<Utc>,
}

/// Leads closed within the trailing window ending at `now` (boundary
/// inclusive), most recently closed first.
pub fn closed_last_week(leads: &[ExpandedLead], now: DateTime<Utc>) -> Vec<ClosedLeadEntry> {
    let since = closed_window_start(now);
    let mut entries: Vec<ClosedLeadEntry> = leads
        .iter()
        .filter(|e| e.lead.status == LeadStatus::Closed)
        .filter_map(|e| {
            let closed_at = e.lead.closed_at.filter(|at| *at >= since)?;
            Some(ClosedLeadEntry {
                id: e.lead.id,
                name: e.lead.name.clone(),
                sales_agent: e
                    .agent
                    .as_ref()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                closed_at,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
    entries
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_leads_in_pipeline: u64,
    #[schema(value_type = Object)]
    pub by_status: StatusCounts,
}

pub fn pipeline_summary(leads: &[Lead]) -> PipelineSummary {
    let by_status = count_by_status(leads.iter().filter(|l| l.status != LeadStatus::Closed));
    PipelineSummary {
        total_leads_in_pipeline: by_status.values().sum(),
        by_status,
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentClosedCount {
    pub agent_id: ObjectId,
    pub agent_name: String,
    pub closed_count: u64,
}

/// Closed leads per resolvable agent, highest count first (ties by name).
/// Leads whose agent no longer resolves are left out.
pub fn closed_by_agent(leads: &[ExpandedLead]) -> Vec<AgentClosedCount> {
    let mut per_agent: BTreeMap<ObjectId, AgentClosedCount> = BTreeMap::new();
    for expanded in leads.iter().filter(|e| e.lead.status == LeadStatus::Closed) {
        let Some(agent) = &expanded.agent else {
            continue;
        };
        per_agent
            .entry(agent.id)
            .or_insert_with(|| AgentClosedCount {
                agent_id: agent.id,
                agent_name: agent.name.clone(),
                closed_count: 0,
            })
            .closed_count += 1;
    }

    let mut counts: Vec<AgentClosedCount> = per_agent.into_values().collect();
    counts.sort_by(|a, b| {
        b.closed_count
            .cmp(&a.closed_count)
            .then_with(|| a.agent_name.cmp(&b.agent_name))
    });
    counts
}

pub fn status_distribution(leads: &[Lead]) -> StatusCounts {
    count_by_status(leads.iter())
}

fn count_by_status<'a>(leads: impl Iterator<Item = &'a Lead>) -> StatusCounts {
    let mut counts = StatusCounts::new();
    for lead in leads {
        *counts.entry(lead.status).or_insert(0) += 1;
    }
    counts
}
