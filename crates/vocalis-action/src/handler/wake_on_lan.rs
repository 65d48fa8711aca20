//! `wol` action: wake a network host with a magic packet.
//!
//! args:
//! - `mac`: MAC address of the host, in any common hex notation
//! - `broadcast`: destination address, defaults to `255.255.255.255`, optional
//! - `port`: destination UDP port, defaults to 9, optional

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use vocalis_core::Arguments;

use crate::error::ActionError;
use crate::handler::{required_str_arg, str_arg, Action};
use crate::types::ActionResult;

const MAGIC_PACKET_LEN: usize = 102;

/// Broadcasts a Wake-on-LAN magic packet.
pub struct WakeOnLanAction {
    repeats: u32,
    interval: Duration,
}

impl Default for WakeOnLanAction {
    fn default() -> Self {
        Self {
            repeats: 20,
            interval: Duration::from_millis(10),
        }
    }
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[:\-. ]").expect("valid separator regex"))
}

/// Parse a MAC address such as `00:11:22:33:44:55` or `0011.2233.4455`.
pub fn parse_mac(mac: &str) -> Result<[u8; 6], ActionError> {
    let hex = separators().replace_all(mac.trim(), "");
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ActionError::InvalidArguments(format!(
            "not a MAC address: {}",
            mac
        )));
    }
    let mut bytes = [0u8; 6];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| ActionError::InvalidArguments(e.to_string()))?;
    }
    Ok(bytes)
}

/// Six `0xff` bytes followed by the MAC repeated sixteen times.
pub fn magic_packet(mac: [u8; 6]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(MAGIC_PACKET_LEN);
    packet.extend_from_slice(&[0xff; 6]);
    for _ in 0..16 {
        packet.extend_from_slice(&mac);
    }
    packet
}

#[async_trait]
impl Action for WakeOnLanAction {
    fn name(&self) -> &str {
        "wol"
    }

    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        let mac_text = required_str_arg(args, "mac")?;
        let mac = parse_mac(mac_text)?;
        let host = str_arg(args, "broadcast")?.unwrap_or("255.255.255.255");
        let port = match args.and_then(|a| a.get("port")) {
            None | Some(serde_json::Value::Null) => 9,
            Some(v) => v
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| {
                    ActionError::InvalidArguments("`port` must be a port number".into())
                })?,
        };

        let packet = magic_packet(mac);
        let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        for _ in 0..self.repeats {
            socket.send_to(&packet, (host, port)).await?;
            tokio::time::sleep(self.interval).await;
        }

        tracing::info!(mac = %mac_text, host = %host, port, "Wake-on-LAN packet sent");
        Ok(ActionResult::message(format!("Woke {}", mac_text)))
    }

    fn describe(&self, args: Option<&Arguments>) -> String {
        let mac = required_str_arg(args, "mac").unwrap_or("<no mac>");
        format!("Wake host: {}", mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mac_formats() {
        let expected = [0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc];
        assert_eq!(parse_mac("00:11:22:AA:BB:CC").unwrap(), expected);
        assert_eq!(parse_mac("00-11-22-aa-bb-cc").unwrap(), expected);
        assert_eq!(parse_mac("0011.22aa.bbcc").unwrap(), expected);
        assert_eq!(parse_mac("001122aabbcc").unwrap(), expected);
    }

    #[test]
    fn test_parse_mac_rejects_garbage() {
        assert!(parse_mac("00:11:22").is_err());
        assert!(parse_mac("zz:11:22:33:44:55").is_err());
        assert!(parse_mac("").is_err());
    }

    #[test]
    fn test_magic_packet_layout() {
        let mac = [1, 2, 3, 4, 5, 6];
        let packet = magic_packet(mac);
        assert_eq!(packet.len(), MAGIC_PACKET_LEN);
        assert_eq!(&packet[..6], &[0xff; 6]);
        for chunk in packet[6..].chunks(6) {
            assert_eq!(chunk, &mac);
        }
    }

    #[tokio::test]
    async fn test_wol_sends_to_local_listener() {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let action = WakeOnLanAction {
            repeats: 1,
            interval: Duration::from_millis(0),
        };
        let args = json!({"mac": "00:11:22:33:44:55", "broadcast": "127.0.0.1", "port": port})
            .as_object()
            .cloned()
            .unwrap();

        action.perform(Some(&args)).await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(n, MAGIC_PACKET_LEN);
        assert_eq!(&buf[6..12], &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    }

    #[tokio::test]
    async fn test_wol_invalid_port() {
        let args = json!({"mac": "00:11:22:33:44:55", "port": 70000})
            .as_object()
            .cloned()
            .unwrap();
        let err = WakeOnLanAction::default().perform(Some(&args)).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidArguments(_)));
    }

    #[test]
    fn test_wol_describe() {
        assert_eq!(WakeOnLanAction::default().describe(None), "Wake host: <no mac>");
    }
}
