use serde::Deserialize;
use serde::Serialize;

/// Device descriptor embedded in every entity's discovery payload.
///
/// Home Assistant groups entities that carry the same descriptor under one
/// device in its registry. Field names use the discovery protocol's
/// abbreviated keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Hardware-unique identifier (hex-encoded)
    #[serde(rename = "ids")]
    pub identifiers: String,

    /// Manufacturer / platform name
    #[serde(rename = "mf")]
    pub manufacturer: String,

    /// Hardware model string
    #[serde(rename = "mdl")]
    pub model: String,

    /// Human-readable device name
    pub name: String,

    /// Firmware/software version
    #[serde(rename = "sw")]
    pub sw_version: String,
}

/// Discovery payload for a sensor or number entity.
///
/// Built progressively: the entity constructor fills `name`, `stat_t` and the
/// optional physical metadata; device registration fills everything else.
/// After registration the payload is frozen and published verbatim to the
/// entity's discovery topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    /// Category base topic, abbreviated by the hub into subsequent topics
    #[serde(rename = "~", skip_serializing_if = "Option::is_none")]
    pub base_topic: Option<String>,

    /// Human-readable entity name
    pub name: String,

    /// State topic, relative to the base topic abbreviation
    #[serde(rename = "stat_t")]
    pub state_topic: String,

    /// Device class (e.g. "temperature"), sensor entities only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,

    /// Unit of measurement (e.g. "°C")
    #[serde(rename = "unit_of_meas", skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    /// Object id, the device-qualified entity name
    #[serde(rename = "obj_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Unique id: `{device_id}_{device_qualified_name}`
    #[serde(rename = "uniq_id", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Embedded device descriptor (snapshot, not a reference)
    #[serde(rename = "dev", skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceDescriptor>,

    /// Value template extracting this entity's key from the state payload
    #[serde(rename = "val_tpl", skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,

    /// State class; "measurement" for physically-classed sensors
    #[serde(rename = "stat_cla", skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
}

impl DiscoveryPayload {
    /// Initial payload as an entity constructor builds it, before device
    /// registration fills in the identity fields.
    pub fn new(name: &str) -> Self {
        Self {
            base_topic: None,
            name: name.to_string(),
            state_topic: "~/state".to_string(),
            device_class: None,
            unit_of_measurement: None,
            object_id: None,
            unique_id: None,
            device: None,
            value_template: None,
            state_class: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_are_skipped() {
        let payload = DiscoveryPayload::new("Soil Moisture");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["name"], "Soil Moisture");
        assert_eq!(json["stat_t"], "~/state");
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_abbreviated_keys() {
        let mut payload = DiscoveryPayload::new("Soil Moisture");
        payload.base_topic = Some("homeassistant/sensor/gw-01-ab12".to_string());
        payload.unit_of_measurement = Some("%".to_string());
        payload.object_id = Some("node_Soil_Moisture".to_string());
        payload.unique_id = Some("gw-01-ab12_node_Soil_Moisture".to_string());
        payload.device = Some(DeviceDescriptor {
            identifiers: "ab12".to_string(),
            manufacturer: "linux".to_string(),
            model: "x86_64".to_string(),
            name: "node".to_string(),
            sw_version: "0.1.0".to_string(),
        });
        payload.value_template = Some("{{ value_json.Soil_Moisture | round(1) }}".to_string());
        payload.state_class = Some("measurement".to_string());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["~"], "homeassistant/sensor/gw-01-ab12");
        assert_eq!(json["unit_of_meas"], "%");
        assert_eq!(json["obj_id"], "node_Soil_Moisture");
        assert_eq!(json["uniq_id"], "gw-01-ab12_node_Soil_Moisture");
        assert_eq!(json["dev"]["ids"], "ab12");
        assert_eq!(json["dev"]["mdl"], "x86_64");
        assert_eq!(json["val_tpl"], "{{ value_json.Soil_Moisture | round(1) }}");
        assert_eq!(json["stat_cla"], "measurement");
    }
}
