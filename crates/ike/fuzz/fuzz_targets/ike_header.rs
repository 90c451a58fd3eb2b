//! Fuzz target for IKE header parsing and SA lookup.
//!
//! Feeds arbitrary datagrams through the same path the dispatcher uses:
//! parse the header, derive the SA id, check out, check in. Looks for:
//! - Panics in the parser
//! - Lookups that leave an SA checked out
//! - Index inconsistencies after many random creations
//!
//! Run with:
//! ```bash
//! cd crates/ike
//! cargo +nightly fuzz run ike_header -- -max_total_time=300
//! ```

#![no_main]
use fynx_ike::ikev2::IkeHeader;
use fynx_ike::{IkeSaId, IkeSaManager, ManagerConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = IkeHeader::from_bytes(data) else {
        return;
    };

    // Re-encoding must parse back to the same header
    let reparsed = IkeHeader::from_bytes(&header.to_bytes()).expect("re-encoded header parses");
    assert_eq!(header, reparsed);

    let manager = IkeSaManager::new(ManagerConfig::default());
    let id = IkeSaId::from_header(&header);
    if let Ok(checkout) = manager.checkout(&id) {
        manager.checkin(checkout.into_inner()).expect("checkin after checkout");
        let sa = manager.checkout(&id).expect("SA just checked in").into_inner();
        manager.checkin_and_delete(sa).expect("delete checked out SA");
    }
    assert!(manager.is_empty());
});
