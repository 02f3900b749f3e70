#![cfg(test)]

use cart_sim::{HostPort, LinkProbe, SimCartridge, SimDriver, SimLink, SimPort};
use link_protocol::{
    request_dump, Channel, ChannelAttrs, DumpImage, LinkResult, NegotiationReply,
};
use pretty_assertions::assert_eq;
use sram_dump::{DumpConfig, DumpError, DumpOrchestrator, DumpReport, DumpResult, DumpStage};
use std::thread;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Run {
    device: DumpResult<DumpReport>,
    host: LinkResult<DumpImage>,
    probe: LinkProbe,
    cart: SimCartridge,
    console: String,
}

/// Runs the host on its own thread and the dumper on this one.
fn run_pair(cart: SimCartridge, port: SimPort, mut host: HostPort) -> Run {
    let probe = port.probe();
    let host_thread = thread::spawn(move || request_dump(&mut host));

    let mut driver = SimDriver::new("#SER0", port);
    let mut dumper = DumpOrchestrator::new(cart, Vec::new(), DumpConfig::default());
    let device = dumper.run(&mut driver);
    let host = host_thread.join().expect("host thread");
    let (cart, console) = dumper.into_parts();
    Run {
        device,
        host,
        probe,
        cart,
        console: String::from_utf8_lossy(&console).into_owned(),
    }
}

fn expected_payload(cart: &SimCartridge, banks: usize, size: usize) -> Vec<u8> {
    (0..banks).flat_map(|bank| cart.bank_view(bank, size)).collect()
}

#[test]
fn mbc3_with_32k_ram_dumps_four_banks() {
    init_logging();
    let cart = SimCartridge::with_header("POKEMON CRYSTAL", 0x13, 3);
    let expected = expected_payload(&cart, 4, 8192);
    let (port, host) = SimLink::pair();

    let run = run_pair(cart, port, host);
    let report = run.device.expect("device");
    let image = run.host.expect("host");

    assert_eq!(image.reply.encode(), [b'=', 4, 0x00, 0x20]);
    assert_eq!(image.payload.len(), 4 * 8192);
    assert!(image.payload == expected, "payload differs from cartridge RAM");
    assert_eq!(report.bytes_sent, image.payload.len());
    assert_eq!(run.probe.attributes(), ChannelAttrs::default());
    assert_eq!(
        run.probe.set_calls(),
        vec![ChannelAttrs::default().with_raw(true), ChannelAttrs::default()]
    );
    assert!(run.probe.closed());
    assert!(!run.cart.ram_enabled());
    assert!(run.console.starts_with("POKEMON CRYSTAL\nCartridge type: 0x13\n"));
}

#[test]
fn mbc2_dumps_one_512_byte_bank() {
    init_logging();
    let cart = SimCartridge::with_header("KID ICARUS", 0x06, 0);
    let expected = expected_payload(&cart, 1, 512);
    let (port, host) = SimLink::pair();

    let run = run_pair(cart, port, host);
    run.device.expect("device");
    let image = run.host.expect("host");

    assert_eq!(image.reply, NegotiationReply::new(1, 512));
    assert_eq!(image.payload, expected);
    assert!(image.payload.iter().all(|byte| byte & 0xF0 == 0xF0));
    assert!(run.console.contains("Cartridge RAM size: 512 B"));
}

#[test]
fn newline_bytes_survive_in_raw_mode() {
    init_logging();
    let cart = SimCartridge::with_header("LINEFEED", 0x1B, 2);
    let expected = expected_payload(&cart, 1, 8192);
    assert!(expected.contains(&b'\n'));
    let (port, host) = SimLink::pair();

    let run = run_pair(cart, port, host);
    run.device.expect("device");
    assert_eq!(run.host.expect("host").payload, expected);
}

#[test]
fn write_failure_in_second_bank_stops_the_stream() {
    init_logging();
    let cart = SimCartridge::with_header("ZELDA DX", 0x1B, 3);
    let (port, mut host) = SimLink::pair();
    let port = port.fail_writes_after(4 + 8192 + 64);
    host.write_all(b"!").expect("hello");

    let probe = port.probe();
    let mut driver = SimDriver::new("#SER0", port);
    let mut dumper = DumpOrchestrator::new(cart, Vec::new(), DumpConfig::default());
    let err = dumper.run(&mut driver).unwrap_err();
    assert!(matches!(
        err,
        DumpError::Link {
            stage: DumpStage::Streaming { bank: 1 },
            ..
        }
    ));

    let received = host.drain();
    assert_eq!(received.len(), 4 + 8192 + 64);
    assert_eq!(received[4 + 8192], 1, "second bank starts with its index");
    assert_eq!(probe.attributes(), ChannelAttrs::default());
    assert!(probe.closed());

    let (cart, _) = dumper.into_parts();
    assert!(!cart.ram_enabled());
}

#[test]
fn raw_channel_is_never_reconfigured() {
    init_logging();
    let cart = SimCartridge::with_header("RAW", 0x10, 3);
    let (port, host) = SimLink::pair();
    let port = port.with_attributes(ChannelAttrs::default().with_raw(true));

    let run = run_pair(cart, port, host);
    run.device.expect("device");
    assert_eq!(run.host.expect("host").payload.len(), 4 * 8192);
    assert!(run.probe.set_calls().is_empty());
    assert!(run.probe.attributes().is_raw());
}

#[test]
fn unsupported_cartridge_sends_nothing() {
    init_logging();
    let cart = SimCartridge::with_header("ROM ONLY", 0x01, 0);
    let (port, mut host) = SimLink::pair();
    let probe = port.probe();
    let mut driver = SimDriver::new("#SER0", port);
    let mut dumper = DumpOrchestrator::new(cart, Vec::new(), DumpConfig::default());

    let err = dumper.run(&mut driver).unwrap_err();
    assert!(matches!(err, DumpError::UnsupportedCartridge { type_byte: 0x01 }));
    assert!(probe.set_calls().is_empty());
    assert!(host.drain().is_empty());
}
