//! Key expressions for bus services on Zenoh.
//!
//! A bus service `<svc>` (e.g. `com.victronenergy.dcsource.ip22`) owns a
//! tree of attribute paths. Each path maps to a Zenoh key under a root
//! prefix:
//!
//! ```text
//! <root>/<svc>/Dc/0/Voltage              attribute value
//! <root>/@/services/<svc>                liveliness token (service is live)
//! <root>/@/write/<svc>/<path>            external write request
//! <root>/@/vreg/<svc>/<op>/<id>/<path>   register get/set request
//! ```

/// Default root prefix for the bus key space.
pub const KEY_PREFIX: &str = "venus";

/// Register operation carried in a register request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    Get,
    Set,
}

impl RegisterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterOp::Get => "get",
            RegisterOp::Set => "set",
        }
    }
}

/// Builder for bus key expressions under a root prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusKeys {
    prefix: String,
}

impl Default for BusKeys {
    fn default() -> Self {
        Self::new(KEY_PREFIX)
    }
}

impl BusKeys {
    /// Create a builder for a root prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The root prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of an attribute path on a service.
    ///
    /// # Example
    /// ```
    /// use chargemeter_common::keyexpr::BusKeys;
    ///
    /// let keys = BusKeys::default();
    /// assert_eq!(
    ///     keys.attribute("com.victronenergy.charger.ttyUSB0", "/Dc/0/Current"),
    ///     "venus/com.victronenergy.charger.ttyUSB0/Dc/0/Current"
    /// );
    /// ```
    pub fn attribute(&self, service: &str, path: &str) -> String {
        format!("{}/{}/{}", self.prefix, service, trim_path(path))
    }

    /// Wildcard over every attribute of a service.
    pub fn service_wildcard(&self, service: &str) -> String {
        format!("{}/{}/**", self.prefix, service)
    }

    /// Liveliness token key announcing a service.
    pub fn liveliness(&self, service: &str) -> String {
        format!("{}/@/services/{}", self.prefix, service)
    }

    /// Wildcard over all service liveliness tokens.
    pub fn liveliness_wildcard(&self) -> String {
        format!("{}/@/services/*", self.prefix)
    }

    /// Key on which external writes to a service path are received.
    pub fn write_request(&self, service: &str, path: &str) -> String {
        format!("{}/@/write/{}/{}", self.prefix, service, trim_path(path))
    }

    /// Wildcard over every external write to a service.
    pub fn write_wildcard(&self, service: &str) -> String {
        format!("{}/@/write/{}/**", self.prefix, service)
    }

    /// Key of a register request for the register item at `path`.
    pub fn register_request(
        &self,
        service: &str,
        op: RegisterOp,
        register_id: u16,
        path: &str,
    ) -> String {
        format!(
            "{}/@/vreg/{}/{}/{}/{}",
            self.prefix,
            service,
            op.as_str(),
            register_id,
            trim_path(path)
        )
    }

    /// Wildcard over every register request to a service.
    pub fn register_wildcard(&self, service: &str) -> String {
        format!("{}/@/vreg/{}/**", self.prefix, service)
    }

    /// Extract the service name from a liveliness token key.
    pub fn parse_liveliness<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        let name = rest.strip_prefix("/@/services/")?;
        (!name.is_empty() && !name.contains('/')).then_some(name)
    }

    /// Extract the attribute path (with leading slash) from a write request key.
    pub fn parse_write_request(&self, service: &str, key: &str) -> Option<String> {
        let head = format!("{}/@/write/{}/", self.prefix, service);
        key.strip_prefix(head.as_str())
            .filter(|p| !p.is_empty())
            .map(|p| format!("/{}", p))
    }

    /// Extract `(op, register_id, path)` from a register request key.
    pub fn parse_register_request(
        &self,
        service: &str,
        key: &str,
    ) -> Option<(RegisterOp, u16, String)> {
        let head = format!("{}/@/vreg/{}/", self.prefix, service);
        let rest = key.strip_prefix(head.as_str())?;
        let mut parts = rest.splitn(3, '/');

        let op = match parts.next()? {
            "get" => RegisterOp::Get,
            "set" => RegisterOp::Set,
            _ => return None,
        };
        let register_id = parts.next()?.parse().ok()?;
        let path = parts.next().filter(|p| !p.is_empty())?;

        Some((op, register_id, format!("/{}", path)))
    }
}

fn trim_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVC: &str = "com.victronenergy.dcsource.ip22";

    #[test]
    fn test_key_builder() {
        let keys = BusKeys::default();

        assert_eq!(
            keys.attribute(SVC, "/Dc/0/Voltage"),
            "venus/com.victronenergy.dcsource.ip22/Dc/0/Voltage"
        );
        assert_eq!(
            keys.service_wildcard(SVC),
            "venus/com.victronenergy.dcsource.ip22/**"
        );
        assert_eq!(
            keys.liveliness(SVC),
            "venus/@/services/com.victronenergy.dcsource.ip22"
        );
        assert_eq!(keys.liveliness_wildcard(), "venus/@/services/*");
        assert_eq!(
            keys.write_request(SVC, "/Mode"),
            "venus/@/write/com.victronenergy.dcsource.ip22/Mode"
        );
    }

    #[test]
    fn test_parse_liveliness() {
        let keys = BusKeys::new("test");
        assert_eq!(
            keys.parse_liveliness("test/@/services/com.victronenergy.charger.ttyS2"),
            Some("com.victronenergy.charger.ttyS2")
        );
        assert_eq!(keys.parse_liveliness("venus/@/services/x"), None);
        assert_eq!(keys.parse_liveliness("test/@/services/"), None);
    }

    #[test]
    fn test_parse_write_request() {
        let keys = BusKeys::default();
        let key = keys.write_request(SVC, "/Settings/MonitorMode");
        assert_eq!(
            keys.parse_write_request(SVC, &key).as_deref(),
            Some("/Settings/MonitorMode")
        );
        assert_eq!(keys.parse_write_request("other", &key), None);
    }

    #[test]
    fn test_register_request_key() {
        let keys = BusKeys::default();
        let key = keys.register_request(SVC, RegisterOp::Get, 0xEEB8, "/Devices/0/VregLink");
        assert_eq!(
            key,
            "venus/@/vreg/com.victronenergy.dcsource.ip22/get/61112/Devices/0/VregLink"
        );

        let (op, id, path) = keys.parse_register_request(SVC, &key).unwrap();
        assert_eq!(op, RegisterOp::Get);
        assert_eq!(id, 0xEEB8);
        assert_eq!(path, "/Devices/0/VregLink");

        assert!(
            keys.parse_register_request(SVC, "venus/@/vreg/com.victronenergy.dcsource.ip22/del/1/X")
                .is_none()
        );
    }
}
