use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use proptest::prelude::*;

use vmdhcp::RouteEntry;
use vmdhcp::encoder::{
    encode_classless_routes, encode_domain_search, is_valid_search_domain, select_domain_name,
};

fn route_strategy() -> impl Strategy<Value = RouteEntry> {
    (
        any::<[u8; 4]>(),
        0u8..=32,
        prop::option::of(any::<[u8; 4]>()),
    )
        .prop_map(|(address, prefix, gateway)| {
            let destination = Ipv4Network::new(Ipv4Addr::from(address), prefix).ok();
            RouteEntry::new(destination, gateway.map(Ipv4Addr::from))
        })
}

fn domain_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,9}(\\.[a-z][a-z0-9]{0,9}){0,3}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn domain_search_never_panics(domains in prop::collection::vec(".{0,80}", 0..8)) {
        match encode_domain_search(&domains) {
            Ok(encoded) => prop_assert!(encoded.len() <= 255),
            Err(_) => {}
        }
    }

    #[test]
    fn domain_search_length_for_valid_domains(
        domains in prop::collection::vec(domain_strategy(), 0..5)
    ) {
        let encoded = encode_domain_search(&domains).unwrap();
        let expected: usize = domains.iter().map(|domain| domain.len() + 2).sum();
        prop_assert_eq!(encoded.len(), expected);
    }

    #[test]
    fn invalid_domain_is_always_rejected(
        valid in domain_strategy(),
        bad in "[ ,_!@]"
    ) {
        let broken = format!("{}{}x", valid, bad);
        prop_assert!(!is_valid_search_domain(&broken));
        prop_assert!(encode_domain_search(&[valid, broken]).is_err());
    }

    #[test]
    fn domain_name_is_from_the_list(
        domains in prop::collection::vec(domain_strategy(), 1..6)
    ) {
        let selected = select_domain_name(&domains).unwrap();
        prop_assert!(domains.iter().any(|domain| domain == selected));

        let labels = |domain: &str| domain.split('.').count();
        let most = domains.iter().map(|domain| labels(domain)).max().unwrap();
        prop_assert_eq!(labels(selected), most);
    }

    #[test]
    fn classless_route_length_matches_prefixes(
        routes in prop::collection::vec(route_strategy(), 0..10)
    ) {
        let encoded = encode_classless_routes(&routes);
        let expected: usize = routes
            .iter()
            .map(|route| 1 + usize::from(route.prefix_len()).div_ceil(8) + 4)
            .sum();
        prop_assert_eq!(encoded.len(), expected);
    }

    #[test]
    fn default_routes_are_encoded_last(
        routes in prop::collection::vec(route_strategy(), 1..10)
    ) {
        let encoded = encode_classless_routes(&routes);
        let specific = routes.iter().filter(|route| !route.is_default()).count();

        let mut offset = 0;
        for index in 0..routes.len() {
            let prefix = encoded[offset];
            if index < specific {
                prop_assert!(prefix > 0);
            } else {
                prop_assert_eq!(prefix, 0);
            }
            offset += 1 + usize::from(prefix).div_ceil(8) + 4;
        }
        prop_assert_eq!(offset, encoded.len());
    }
}
