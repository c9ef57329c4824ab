use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use vmdhcp::options::DhcpOption;
use vmdhcp::resolv::ResolverConfig;
use vmdhcp::{
    Config, CustomOptions, DhcpPacket, MacAddress, MacRequest, MessageType, OptionCode,
    PrivateOption, Responder,
};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const GUEST_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x11, 0x22, 0x33];
const STRANGER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x44, 0x55, 0x66];

fn create_dhcp_packet(message_type: MessageType, mac: [u8; 6], xid: u32) -> Vec<u8> {
    let mut packet = vec![0u8; 240];
    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[4..8].copy_from_slice(&xid.to_be_bytes());
    packet[28..34].copy_from_slice(&mac);
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
    packet.extend_from_slice(&[53, 1, message_type as u8, 255]);
    packet
}

fn guest_config() -> Config {
    Config {
        hostname: Some("vm-under-test".to_string()),
        dhcp_options: Some(CustomOptions {
            boot_file_name: Some("pxelinux.0".to_string()),
            ntp_servers: vec![Ipv4Addr::new(10, 0, 0, 123)],
            private_options: vec![PrivateOption {
                option: 240,
                value: "extra".to_string(),
            }],
            ..CustomOptions::default()
        }),
        ..Config::default()
    }
}

fn responder() -> Responder {
    let request = MacRequest::Explicit(MacAddress::new(GUEST_MAC).to_string());
    let guest = Ipv4Network::new(Ipv4Addr::new(10, 244, 3, 9), 24).unwrap();
    let resolver = ResolverConfig::parse(
        "search default.svc.cluster.local svc.cluster.local cluster.local\n\
         nameserver 10.96.0.10\n",
    );

    Responder::prepare(&request, &guest_config(), &guest, &resolver).unwrap()
}

fn raw_options(reply: &DhcpPacket) -> Vec<(u8, Vec<u8>)> {
    reply
        .options
        .iter()
        .filter_map(|option| match option {
            DhcpOption::Raw(code, data) => Some((*code, data.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn stranger_gets_no_reply() {
    let responder = responder();

    let discover = create_dhcp_packet(MessageType::Discover, STRANGER_MAC, 1);
    assert!(responder.respond_to_bytes(&discover).unwrap().is_none());

    let request = create_dhcp_packet(MessageType::Request, STRANGER_MAC, 2);
    assert!(responder.respond_to_bytes(&request).unwrap().is_none());
}

#[test]
fn full_exchange_with_expected_client() {
    let responder = responder();
    let expected: Vec<(u8, Vec<u8>)> = responder
        .options()
        .iter()
        .map(|(code, data)| (code, data.to_vec()))
        .collect();

    let discover = create_dhcp_packet(MessageType::Discover, GUEST_MAC, 0x1234);
    let offer = responder.respond_to_bytes(&discover).unwrap().unwrap();

    assert_eq!(offer.message_type(), Some(MessageType::Offer));
    assert_eq!(offer.xid, 0x1234);
    assert_eq!(offer.yiaddr, Ipv4Addr::new(10, 244, 3, 9));
    assert_eq!(offer.client_mac(), Some(MacAddress::new(GUEST_MAC)));
    assert_eq!(raw_options(&offer), expected);

    let request = create_dhcp_packet(MessageType::Request, GUEST_MAC, 0x1235);
    let ack = responder.respond_to_bytes(&request).unwrap().unwrap();

    assert_eq!(ack.message_type(), Some(MessageType::Ack));
    assert_eq!(ack.yiaddr, offer.yiaddr);
    assert_eq!(raw_options(&ack), expected);
}

#[test]
fn lease_options_reach_the_wire() {
    let responder = responder();
    let discover = create_dhcp_packet(MessageType::Discover, GUEST_MAC, 5);
    let offer = responder.respond_to_bytes(&discover).unwrap().unwrap();

    let wire = DhcpPacket::parse(&offer.encode()).unwrap();
    let option = |code: OptionCode| match wire.option(code as u8) {
        Some(DhcpOption::Raw(_, data)) => Some(data.clone()),
        _ => None,
    };

    assert_eq!(option(OptionCode::SubnetMask), Some(vec![255, 255, 255, 0]));
    assert_eq!(option(OptionCode::Router), Some(vec![169, 254, 1, 1]));
    assert_eq!(option(OptionCode::DnsServer), Some(vec![10, 96, 0, 10]));
    assert_eq!(
        option(OptionCode::DomainName),
        Some(b"default.svc.cluster.local".to_vec())
    );
    assert_eq!(option(OptionCode::InterfaceMtu), Some(1480u16.to_be_bytes().to_vec()));
    assert_eq!(option(OptionCode::BootFileName), Some(b"pxelinux.0".to_vec()));
    assert_eq!(option(OptionCode::NtpServers), Some(vec![10, 0, 0, 123]));
    assert_eq!(
        option(OptionCode::ClasslessStaticRoute),
        Some(vec![32, 169, 254, 1, 1, 0, 0, 0, 0, 0, 169, 254, 1, 1])
    );
    assert!(matches!(
        wire.option(240),
        Some(DhcpOption::Raw(240, data)) if data == b"extra"
    ));
    assert_eq!(wire.hostname(), Some("vm-under-test"));
    assert_eq!(wire.server_identifier(), Some(Ipv4Addr::new(169, 254, 75, 10)));
}

#[test]
fn derived_identity_is_served() {
    let request = MacRequest::Derived("3b2c1d0e-vmi".to_string());
    let mac = request.resolve().unwrap();
    let guest = Ipv4Network::new(Ipv4Addr::new(10, 244, 3, 9), 24).unwrap();
    let resolver = ResolverConfig::parse("nameserver 10.96.0.10\n");

    let responder = Responder::prepare(&request, &Config::default(), &guest, &resolver).unwrap();
    assert_eq!(responder.lease().client_mac, mac);

    let discover = create_dhcp_packet(MessageType::Discover, mac.octets(), 1);
    assert!(responder.respond_to_bytes(&discover).unwrap().is_some());
}
