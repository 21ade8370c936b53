//! Diagnostic registers behind `/Devices/0/VregLink`.
//!
//! Only one register is answered with data. Writes are acknowledged and
//! echoed but not stored.

use chargemeter_bus::{RegisterHandler, RegisterResponse};

/// Register queried by consumers probing the device.
pub const DIAGNOSTIC_REGISTER: u16 = 0xEEB8;

/// Value reported for [`DIAGNOSTIC_REGISTER`].
pub const DIAGNOSTIC_VALUE: u8 = 0xFE;

/// Stateless register handler of the virtual device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticRegisters;

impl RegisterHandler for DiagnosticRegisters {
    fn get(&self, register_id: u16) -> RegisterResponse {
        if register_id == DIAGNOSTIC_REGISTER {
            tracing::info!(register = register_id, "Register link get");
            return RegisterResponse::ok(vec![DIAGNOSTIC_VALUE]);
        }
        RegisterResponse::ok(Vec::new())
    }

    fn set(&self, register_id: u16, payload: &[u8]) -> RegisterResponse {
        tracing::debug!(register = register_id, len = payload.len(), "Register link set");
        RegisterResponse::ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargemeter_bus::RegisterStatus;

    #[test]
    fn test_diagnostic_register() {
        let response = DiagnosticRegisters.get(0xEEB8);
        assert_eq!(response.status, RegisterStatus::Ok);
        assert_eq!(response.payload, vec![0xFE]);
    }

    #[test]
    fn test_other_registers_are_empty() {
        for id in [0x0000, 0x0100, 0xEEB7, 0xEEB9, 0xFFFF] {
            let response = DiagnosticRegisters.get(id);
            assert_eq!(response.status, RegisterStatus::Ok);
            assert!(response.payload.is_empty());
        }
    }

    #[test]
    fn test_set_echoes_payload() {
        let response = DiagnosticRegisters.set(0x0200, &[1, 2, 3]);
        assert_eq!(response.status, RegisterStatus::Ok);
        assert_eq!(response.payload, vec![1, 2, 3]);

        let response = DiagnosticRegisters.set(DIAGNOSTIC_REGISTER, &[]);
        assert_eq!(response.status, RegisterStatus::Ok);
        assert!(response.payload.is_empty());
    }
}
