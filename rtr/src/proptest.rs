// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for the RTR wire format and snapshot store
//!
//! These tests verify:
//! - every pdu type survives encoding and decoding unchanged
//! - the header length always equals the encoded size
//! - truncated or corrupted input is rejected without panicking
//! - cumulative deltas rebuild the newest snapshot from an older one

use crate::error::Error;
use crate::messages::{
    EndOfData, ErrorCode, ErrorReport, Header, Message, Pdu, PrefixPdu,
    ProtocolVersion, SerialPdu, Timers,
};
use crate::store::SnapshotStore;
use crate::types::{Prefix, Prefix4, Prefix6, Roa};
use proptest::prelude::*;
use rtr_common::log::discard_logger;
use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};

// =============================================================================
// Strategies
// =============================================================================

fn version_strategy() -> impl Strategy<Value = ProtocolVersion> {
    prop_oneof![Just(ProtocolVersion::V0), Just(ProtocolVersion::V1)]
}

fn roa4_strategy() -> impl Strategy<Value = Roa> {
    (any::<u32>(), 0u8..=32u8, any::<u32>())
        .prop_flat_map(|(addr, len, asn)| {
            (Just(addr), Just(len), len..=32u8, Just(asn))
        })
        .prop_map(|(addr, len, max, asn)| {
            let p = Prefix4::new(Ipv4Addr::from(addr), len).expect("v4");
            Roa::new(Prefix::V4(p), max, asn).expect("roa")
        })
}

fn roa6_strategy() -> impl Strategy<Value = Roa> {
    (any::<u128>(), 0u8..=128u8, any::<u32>())
        .prop_flat_map(|(addr, len, asn)| {
            (Just(addr), Just(len), len..=128u8, Just(asn))
        })
        .prop_map(|(addr, len, max, asn)| {
            let p = Prefix6::new(Ipv6Addr::from(addr), len).expect("v6");
            Roa::new(Prefix::V6(p), max, asn).expect("roa")
        })
}

fn roa_strategy() -> impl Strategy<Value = Roa> {
    prop_oneof![roa4_strategy(), roa6_strategy()]
}

fn timers_strategy() -> impl Strategy<Value = Timers> {
    (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
        |(refresh, retry, expire)| Timers {
            refresh,
            retry,
            expire,
        },
    )
}

fn error_code_strategy() -> impl Strategy<Value = ErrorCode> {
    (0u16..=8u16).prop_map(|c| ErrorCode::try_from(c).expect("code"))
}

fn pdu_strategy(version: ProtocolVersion) -> impl Strategy<Value = Pdu> {
    let serial = (any::<u16>(), any::<u32>())
        .prop_map(|(session_id, serial)| SerialPdu { session_id, serial });
    prop_oneof![
        serial.clone().prop_map(Pdu::SerialNotify),
        serial.prop_map(Pdu::SerialQuery),
        Just(Pdu::ResetQuery),
        any::<u16>().prop_map(|session_id| Pdu::CacheResponse { session_id }),
        (any::<bool>(), roa_strategy()).prop_map(|(announce, roa)| {
            Pdu::Prefix(PrefixPdu { announce, roa })
        }),
        (any::<u16>(), any::<u32>(), timers_strategy()).prop_map(
            move |(session_id, serial, timers)| {
                Pdu::EndOfData(EndOfData::new(
                    version, session_id, serial, timers,
                ))
            }
        ),
        Just(Pdu::CacheReset),
        (
            error_code_strategy(),
            prop::collection::vec(any::<u8>(), 0..64),
            "[ -~]{0,40}"
        )
            .prop_map(|(code, pdu, text)| {
                Pdu::ErrorReport(ErrorReport::new(code, pdu, text))
            }),
    ]
}

fn message_strategy() -> impl Strategy<Value = Message> {
    version_strategy().prop_flat_map(|version| {
        pdu_strategy(version).prop_map(move |pdu| Message { version, pdu })
    })
}

// =============================================================================
// Wire format properties
// =============================================================================

proptest! {
    #[test]
    fn prop_message_round_trip(m0 in message_strategy()) {
        let buf = m0.to_wire().expect("to wire");
        let m1 = Message::from_wire(&buf).expect("from wire");
        prop_assert_eq!(m0, m1);
    }

    #[test]
    fn prop_length_matches_encoding(m in message_strategy()) {
        let buf = m.to_wire().expect("to wire");
        let header = Header::from_wire(&buf).expect("header");
        prop_assert_eq!(header.length as usize, buf.len());
        prop_assert_eq!(header.version, u8::from(m.version));
    }

    #[test]
    fn prop_truncation_rejected(m in message_strategy(), cut in 0usize..64) {
        let buf = m.to_wire().expect("to wire");
        let cut = cut % buf.len();
        let result = Message::from_wire(&buf[..cut]);
        prop_assert!(matches!(result, Err(Error::MalformedPdu(_))));
    }

    #[test]
    fn prop_extension_rejected(
        m in message_strategy(),
        extra in prop::collection::vec(any::<u8>(), 1..16),
    ) {
        let mut buf = m.to_wire().expect("to wire");
        buf.extend_from_slice(&extra);
        prop_assert!(Message::from_wire(&buf).is_err());
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(
        buf in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let _ = Message::from_wire(&buf);
        let _ = crate::messages::take_pdu(&buf);
    }
}

// =============================================================================
// Boundary values
// =============================================================================

#[test]
fn prefix_boundaries_round_trip() {
    let cases = [
        ("0.0.0.0/0", 0, 0),
        ("0.0.0.0/0", 32, u32::MAX),
        ("255.255.255.255/32", 32, u32::MAX),
        ("::/0", 0, 0),
        ("::/0", 128, u32::MAX),
        ("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128", 128, u32::MAX),
    ];
    for (p, max, asn) in cases {
        let roa = Roa::new(p.parse().expect("prefix"), max, asn).expect("roa");
        for version in [ProtocolVersion::V0, ProtocolVersion::V1] {
            for announce in [true, false] {
                let m0 = Message::new(version, PrefixPdu { announce, roa });
                let buf = m0.to_wire().expect("to wire");
                assert_eq!(Message::from_wire(&buf).expect("from wire"), m0);
            }
        }
    }
}

// =============================================================================
// Snapshot store properties
// =============================================================================

fn roa_set_strategy() -> impl Strategy<Value = BTreeSet<Roa>> {
    // a small pool so that successive sets overlap
    prop::collection::btree_set(
        (0u32..8, 8u8..=10u8, 0u32..3).prop_map(|(net, max, asn)| {
            let p = Prefix4::new(Ipv4Addr::new(10, net as u8, 0, 0), 16)
                .expect("v4");
            Roa::new(Prefix::V4(p), max + 8, asn).expect("roa")
        }),
        0..12,
    )
}

proptest! {
    #[test]
    fn prop_delta_rebuilds_current(
        sets in prop::collection::vec(roa_set_strategy(), 1..8),
        depth in 1usize..10,
    ) {
        let store = SnapshotStore::new(depth, 1, discard_logger());
        let mut published = Vec::new();
        for set in &sets {
            published.push(store.replace(set.iter().copied()));
        }
        let current = store.current().expect("current");

        for (i, snapshot) in published.iter().enumerate() {
            let behind = published.len() - 1 - i;
            match store.delta_since(snapshot.generation()) {
                Some(delta) => {
                    prop_assert!(behind <= depth);
                    prop_assert!(delta.added.is_disjoint(&delta.removed));
                    let mut rebuilt = snapshot.roas().clone();
                    delta.apply(&mut rebuilt);
                    prop_assert_eq!(&rebuilt, current.roas());
                    // nothing unchanged is ever sent
                    for roa in &delta.added {
                        prop_assert!(!snapshot.roas().contains(roa));
                    }
                    for roa in &delta.removed {
                        prop_assert!(!current.roas().contains(roa));
                    }
                }
                None => prop_assert!(behind > depth),
            }
        }
    }
}
