//! Projection of a raw WeatherAPI.com payload onto the dashboard's display fields.
//!
//! This is a pure function (no I/O). Missing fields at any nesting level
//! become `None`; nothing in here can fail.

use serde::Serialize;
use serde_json::{Map, Value};

/// Flat mapping of the fields the dashboard shows.
///
/// Values are the provider's JSON scalars copied unchanged, so an integer
/// `temp_c` stays an integer. Absent fields serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoreMetrics {
    pub name: Option<Value>,
    pub region: Option<Value>,
    pub country: Option<Value>,
    pub lat: Option<Value>,
    pub lon: Option<Value>,
    pub localtime: Option<Value>,
    pub temp_c: Option<Value>,
    pub feelslike_c: Option<Value>,
    pub humidity: Option<Value>,
    pub condition_text: Option<Value>,
    pub icon: Option<Value>,
    pub last_updated: Option<Value>,
    pub wind_kph: Option<Value>,
    pub wind_dir: Option<Value>,
    pub gust_kph: Option<Value>,
    pub pressure_mb: Option<Value>,
    pub uv: Option<Value>,
    pub vis_km: Option<Value>,
    pub cloud: Option<Value>,
    pub dewpoint_c: Option<Value>,
}

impl CoreMetrics {
    /// True when no field was extracted (failed or empty payload).
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Latitude and longitude, when both are numeric.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.as_ref().and_then(Value::as_f64)?;
        let lon = self.lon.as_ref().and_then(Value::as_f64)?;
        Some((lat, lon))
    }
}

/// Extract the core display metrics from a provider payload.
///
/// Returns an empty `CoreMetrics` when the payload is not an object, is an
/// empty object, or carries an `error` key.
pub fn project(payload: &Value) -> CoreMetrics {
    let root = match payload.as_object() {
        Some(obj) if !obj.is_empty() && !obj.contains_key("error") => obj,
        _ => return CoreMetrics::default(),
    };

    let loc = sub_object(root, "location");
    let cur = sub_object(root, "current");
    let cond = cur.and_then(|c| sub_object(c, "condition"));

    CoreMetrics {
        name: field(loc, "name"),
        region: field(loc, "region"),
        country: field(loc, "country"),
        lat: field(loc, "lat"),
        lon: field(loc, "lon"),
        localtime: field(loc, "localtime"),
        temp_c: field(cur, "temp_c"),
        feelslike_c: field(cur, "feelslike_c"),
        humidity: field(cur, "humidity"),
        condition_text: field(cond, "text"),
        icon: field(cond, "icon"),
        last_updated: field(cur, "last_updated"),
        wind_kph: field(cur, "wind_kph"),
        wind_dir: field(cur, "wind_dir"),
        gust_kph: field(cur, "gust_kph"),
        pressure_mb: field(cur, "pressure_mb"),
        uv: field(cur, "uv"),
        vis_km: field(cur, "vis_km"),
        cloud: field(cur, "cloud"),
        dewpoint_c: field(cur, "dewpoint_c"),
    }
}

fn sub_object<'a>(parent: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    parent.get(key).and_then(Value::as_object)
}

// A JSON null counts as missing.
fn field(obj: Option<&Map<String, Value>>, key: &str) -> Option<Value> {
    obj.and_then(|o| o.get(key))
        .filter(|v| !v.is_null())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "location": {
                "name": "Lahore",
                "region": "Punjab",
                "country": "Pakistan",
                "lat": 31.55,
                "lon": 74.34,
                "tz_id": "Asia/Karachi",
                "localtime": "2026-06-01 14:05"
            },
            "current": {
                "last_updated": "2026-06-01 14:00",
                "temp_c": 41.2,
                "feelslike_c": 44.0,
                "humidity": 18,
                "condition": {
                    "text": "Sunny",
                    "icon": "//cdn.weatherapi.com/weather/64x64/day/113.png",
                    "code": 1000
                },
                "wind_kph": 13.0,
                "wind_dir": "NW",
                "gust_kph": 15.4,
                "pressure_mb": 1002.0,
                "uv": 9.0,
                "vis_km": 6.0,
                "cloud": 0,
                "dewpoint_c": 9.8
            }
        })
    }

    #[test]
    fn test_project_partial_payload() {
        let payload = json!({
            "location": {"name": "Lahore", "lat": 31.5, "lon": 74.3},
            "current": {"temp_c": 30, "condition": {"text": "Sunny", "icon": "//x/icon.png"}}
        });

        let m = project(&payload);
        assert_eq!(m.name, Some(json!("Lahore")));
        assert_eq!(m.lat, Some(json!(31.5)));
        assert_eq!(m.lon, Some(json!(74.3)));
        assert_eq!(m.temp_c, Some(json!(30)));
        assert_eq!(m.condition_text, Some(json!("Sunny")));
        assert_eq!(m.icon, Some(json!("//x/icon.png")));

        assert_eq!(m.region, None);
        assert_eq!(m.humidity, None);
        assert_eq!(m.wind_kph, None);
        assert_eq!(m.dewpoint_c, None);
    }

    #[test]
    fn test_project_integer_stays_integer() {
        let payload = json!({"current": {"temp_c": 30}});
        let m = project(&payload);
        assert!(m.temp_c.as_ref().unwrap().is_i64());
    }

    #[test]
    fn test_project_full_payload() {
        let m = project(&full_payload());
        assert_eq!(m.region, Some(json!("Punjab")));
        assert_eq!(m.country, Some(json!("Pakistan")));
        assert_eq!(m.localtime, Some(json!("2026-06-01 14:05")));
        assert_eq!(m.feelslike_c, Some(json!(44.0)));
        assert_eq!(m.humidity, Some(json!(18)));
        assert_eq!(m.last_updated, Some(json!("2026-06-01 14:00")));
        assert_eq!(m.wind_dir, Some(json!("NW")));
        assert_eq!(m.gust_kph, Some(json!(15.4)));
        assert_eq!(m.pressure_mb, Some(json!(1002.0)));
        assert_eq!(m.uv, Some(json!(9.0)));
        assert_eq!(m.vis_km, Some(json!(6.0)));
        assert_eq!(m.cloud, Some(json!(0)));
        assert_eq!(m.dewpoint_c, Some(json!(9.8)));
        assert_eq!(m.coordinates(), Some((31.55, 74.34)));
    }

    #[test]
    fn test_project_error_payload_is_empty() {
        assert!(project(&json!({"error": "timeout"})).is_empty());
        assert!(project(&json!({"error": {"code": 1006, "message": "No matching location found."}})).is_empty());
    }

    #[test]
    fn test_project_error_key_wins_over_data() {
        let mut payload = full_payload();
        payload["error"] = json!("boom");
        assert!(project(&payload).is_empty());
    }

    #[test]
    fn test_project_empty_and_non_object() {
        assert!(project(&json!({})).is_empty());
        assert!(project(&Value::Null).is_empty());
        assert!(project(&json!([1, 2, 3])).is_empty());
        assert!(project(&json!("Lahore")).is_empty());
    }

    #[test]
    fn test_project_null_or_wrong_typed_sub_objects() {
        let payload = json!({"location": null, "current": {"temp_c": 12, "condition": "cloudy"}});
        let m = project(&payload);
        assert_eq!(m.name, None);
        assert_eq!(m.temp_c, Some(json!(12)));
        assert_eq!(m.condition_text, None);
        assert_eq!(m.icon, None);
    }

    #[test]
    fn test_project_is_idempotent() {
        let payload = full_payload();
        assert_eq!(project(&payload), project(&payload));
    }

    #[test]
    fn test_coordinates_require_both() {
        let m = project(&json!({"location": {"lat": 31.5}}));
        assert_eq!(m.coordinates(), None);
    }

    #[test]
    fn test_serializes_absent_as_null() {
        let m = project(&json!({"location": {"name": "Lahore"}}));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["name"], json!("Lahore"));
        assert!(v["temp_c"].is_null());
        assert_eq!(v.as_object().unwrap().len(), 20);
    }
}
