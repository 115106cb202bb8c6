use std::fmt;

/// Entity category segment in Home Assistant discovery topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Logs,
    Number,
    Sensor,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Component::Logs => "logs",
            Component::Number => "number",
            Component::Sensor => "sensor",
        };
        f.write_str(s)
    }
}

/// Build a per-entity discovery topic.
///
/// Format: `{prefix}/{component}/{unique_id}/config`
/// Example: `homeassistant/sensor/gw-01-deadbeef_Greenhouse_Node_soil/config`
pub fn discovery_topic(prefix: &str, component: Component, unique_id: &str) -> String {
    format!("{}/{}/{}/config", prefix, component, unique_id)
}

/// Build a device-scoped base topic for one entity category.
///
/// Format: `{prefix}/{component}/{device_id}`
///
/// This is the topic registered under the `~` abbreviation in discovery
/// payloads, and the base the hub resolves `stat_t: "~/state"` against.
pub fn base_topic(prefix: &str, component: Component, device_id: &str) -> String {
    format!("{}/{}/{}", prefix, component, device_id)
}

/// Build the state topic under a category base topic.
pub fn state_topic(base: &str) -> String {
    format!("{}/state", base)
}
