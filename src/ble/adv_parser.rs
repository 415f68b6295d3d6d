//! Advertising data parsing for candidate filtering.

use heapless::String;

/// AD type: incomplete list of 16-bit service UUIDs.
const AD_INCOMPLETE_UUID16: u8 = 0x02;
/// AD type: complete list of 16-bit service UUIDs.
const AD_COMPLETE_UUID16: u8 = 0x03;
/// AD type: shortened local name.
const AD_SHORT_NAME: u8 = 0x08;
/// AD type: complete local name.
const AD_COMPLETE_NAME: u8 = 0x09;

/// Iterator over `(ad_type, payload)` pairs.
///
/// Stops at the first zero-length or truncated structure.
pub struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> AdStructures<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.data.split_first()?;
        let len = len as usize;
        if len == 0 || len > rest.len() {
            self.data = &[];
            return None;
        }
        let (entry, tail) = rest.split_at(len);
        self.data = tail;
        Some((entry[0], &entry[1..]))
    }
}

/// Whether the advertisement lists `uuid` among its 16-bit service UUIDs.
pub fn advertises_service(data: &[u8], uuid: u16) -> bool {
    let wanted = uuid.to_le_bytes();
    AdStructures::new(data)
        .filter(|(ad_type, _)| matches!(*ad_type, AD_INCOMPLETE_UUID16 | AD_COMPLETE_UUID16))
        .any(|(_, uuids)| uuids.chunks_exact(2).any(|chunk| chunk == wanted))
}

/// Complete or shortened local name, truncated to 32 bytes.
pub fn local_name(data: &[u8]) -> Option<String<32>> {
    let (_, raw) = AdStructures::new(data)
        .find(|(ad_type, _)| matches!(*ad_type, AD_SHORT_NAME | AD_COMPLETE_NAME))?;
    let mut name = String::new();
    for &b in raw {
        if name.push(b as char).is_err() {
            break;
        }
    }
    Some(name)
}

/// Local name, or "Unknown" when the advertisement carries none.
pub fn device_name(data: &[u8]) -> String<32> {
    local_name(data).unwrap_or_else(|| {
        let mut s = String::new();
        let _ = s.push_str("Unknown");
        s
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BATTERY_SERV_UUID, HID_SERV_UUID};

    #[test]
    fn detect_hid_uuid_in_advertisement() {
        let ad_data = [0x03, 0x03, 0x12, 0x18];
        assert!(advertises_service(&ad_data, HID_SERV_UUID));
    }

    #[test]
    fn other_uuid_does_not_match() {
        let ad_data = [0x03, 0x03, 0x0F, 0x18];
        assert!(!advertises_service(&ad_data, HID_SERV_UUID));
        assert!(advertises_service(&ad_data, BATTERY_SERV_UUID));
    }

    #[test]
    fn hid_uuid_among_multiple_uuids_in_incomplete_list() {
        let ad_data = [
            0x02, 0x01, 0x06, // flags
            0x07, 0x02, 0x0F, 0x18, 0x12, 0x18, 0x01, 0x18,
        ];
        assert!(advertises_service(&ad_data, HID_SERV_UUID));
    }

    #[test]
    fn uuid_bytes_straddling_entries_do_not_match() {
        // 0x1812 split across two UUIDs: [0x00,0x12] [0x18,0x00]
        let ad_data = [0x05, 0x03, 0x00, 0x12, 0x18, 0x00];
        assert!(!advertises_service(&ad_data, HID_SERV_UUID));
    }

    #[test]
    fn malformed_lengths_stop_parsing() {
        assert!(!advertises_service(&[], HID_SERV_UUID));
        assert!(!advertises_service(&[0x00, 0x03, 0x12, 0x18], HID_SERV_UUID));
        assert!(!advertises_service(&[0x05, 0x03, 0x12], HID_SERV_UUID));
    }

    #[test]
    fn extract_complete_and_short_names() {
        let complete = [0x05, 0x09, b'X', b'b', b'o', b'x'];
        assert_eq!(device_name(&complete).as_str(), "Xbox");

        let short = [0x03, 0x08, b'X', b'b'];
        assert_eq!(device_name(&short).as_str(), "Xb");
    }

    #[test]
    fn missing_name_is_unknown() {
        let ad_data = [0x02, 0x01, 0x06];
        assert_eq!(local_name(&ad_data), None);
        assert_eq!(device_name(&ad_data).as_str(), "Unknown");
    }

    #[test]
    fn name_truncated_to_32_chars() {
        let mut ad_data = [0u8; 40];
        ad_data[0] = 36;
        ad_data[1] = 0x09;
        for b in ad_data[2..37].iter_mut() {
            *b = b'X';
        }
        assert_eq!(device_name(&ad_data).len(), 32);
    }
}
