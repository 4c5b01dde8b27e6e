use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A service the customer has asked for, as typed (pre-resolution) plus the
/// duration the Service Resolver attached to it (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetail {
    pub name: String,
    pub duration_minutes: Option<i64>,
}

/// A candidate or chosen appointment slot. `stylist_id`/`stylist_name` ride
/// along so a slot picked from a multi-stylist availability list can be
/// compared against the customer's previously selected stylist without a
/// second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotData {
    pub start: DateTime<Utc>,
    pub stylist_id: String,
    pub stylist_name: Option<String>,
}

/// Everything accumulated across a booking flow. Lives inside the
/// checkpoint (C1) alongside the state tag; survives the full flow from
/// `IDLE` to `BOOKED`, then is mostly cleared by [`crate::BookingFsm::reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedData {
    pub customer_id: Option<String>,
    pub services: Vec<ServiceDetail>,
    pub stylist_id: Option<String>,
    pub stylist_name: Option<String>,
    pub slot: Option<SlotData>,
    pub slots_shown: Vec<SlotData>,
    pub customer_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub third_party: bool,
    pub notes: Option<String>,
    pub notes_asked: bool,
    pub name_confirmed: bool,
    pub pending_stylist_id: Option<String>,
    pub pending_stylist_name: Option<String>,
    pub pending_slot: Option<SlotData>,
    pub appointment_id: Option<String>,
}

impl CollectedData {
    pub fn has_pending_stylist_change(&self) -> bool {
        self.pending_stylist_id.is_some() || self.pending_slot.is_some()
    }

    pub fn clear_pending(&mut self) {
        self.pending_stylist_id = None;
        self.pending_stylist_name = None;
        self.pending_slot = None;
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    /// §3.2 invariant: `total_duration_minutes = Σ service_details[*].duration_minutes`
    /// whenever `service_details` is populated.
    pub fn total_duration_minutes(&self) -> i64 {
        self.services.iter().filter_map(|s| s.duration_minutes).sum()
    }

    /// Add a service by name, case-insensitive de-duplicated, empty strings
    /// filtered, duration left unresolved until the Service Resolver (C5)
    /// fills it in (spec.md §4.2.2 step 5).
    pub fn add_service(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let already_present = self
            .services
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name));
        if !already_present {
            self.services.push(ServiceDetail {
                name: name.to_string(),
                duration_minutes: None,
            });
        }
    }

    /// Merge the classifier's entity bag into accumulated data
    /// (spec.md §4.2.2 step 5: services accumulate, scalar fields overwrite).
    pub fn merge_entities(&mut self, entities: &std::collections::HashMap<String, serde_json::Value>) {
        if let Some(services) = entities.get("services").and_then(|v| v.as_array()) {
            for s in services {
                if let Some(name) = s.as_str() {
                    self.add_service(name);
                }
            }
        }
        if let Some(name) = entities.get("service").and_then(|v| v.as_str()) {
            self.add_service(name);
        }
        if let Some(v) = entities.get("stylist_id").and_then(|v| v.as_str()) {
            self.stylist_id = Some(v.to_string());
        }
        if let Some(v) = entities.get("stylist_name").and_then(|v| v.as_str()) {
            self.stylist_name = Some(v.to_string());
        }
        if let Some(slot) = entities.get("slot").and_then(|v| v.as_object()) {
            if let Some(start_str) = slot.get("start_time").and_then(|v| v.as_str()) {
                if let Ok(start) = DateTime::parse_from_rfc3339(start_str) {
                    self.slot = Some(SlotData {
                        start: start.with_timezone(&Utc),
                        stylist_id: slot
                            .get("stylist_id")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .or_else(|| self.stylist_id.clone())
                            .unwrap_or_default(),
                        stylist_name: slot
                            .get("stylist_name")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .or_else(|| self.stylist_name.clone()),
                    });
                }
            }
        }
        if let Some(v) = entities.get("first_name").and_then(|v| v.as_str()) {
            self.customer_name = Some(v.to_string());
        }
        if let Some(v) = entities.get("last_name").and_then(|v| v.as_str()) {
            self.customer_last_name = Some(v.to_string());
        }
        if let Some(v) = entities.get("notes").and_then(|v| v.as_str()) {
            self.notes = Some(v.to_string());
        }
        if let Some(v) = entities.get("customer_id").and_then(|v| v.as_str()) {
            self.customer_id = Some(v.to_string());
        }
        if entities.get("third_party").and_then(|v| v.as_bool()) == Some(true) {
            self.third_party = true;
        }
    }
}
