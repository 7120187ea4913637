//! Example: Reading data from PLC memory
//!
//! Run with: cargo run --example simple_read
//!
//! This example demonstrates:
//! - Connecting to an S7 CPU over ISO-on-TCP
//! - Reading byte ranges from data blocks, flags, and process images
//! - Decoding typed values from the result buffer
//! - Reading individual bits
//! - Reading several independent items in one request

use s7comm::{
    Area, Connection, ConnectionParams, Interface, RequestItem, TcpTransport, DEFAULT_ISO_PORT,
};
use std::net::{Ipv4Addr, SocketAddr};

fn main() -> s7comm::Result<()> {
    // =========================================================================
    // Connect to PLC
    // =========================================================================

    let iface = Interface::new("IF1");
    let addr = SocketAddr::from((Ipv4Addr::new(192, 168, 1, 17), DEFAULT_ISO_PORT));
    let mut transport = TcpTransport::connect(addr, iface.timeout())?;

    // CPU in rack 0, slot 2 (the common layout for an S7-300)
    let mut plc = Connection::new(ConnectionParams::new(0, 2));
    plc.connect(&iface, &mut transport)?;
    println!("Connected, negotiated PDU length: {}\n", plc.pdu_length());

    // =========================================================================
    // Reading Data Blocks
    // =========================================================================

    println!("=== Reading Data Blocks ===\n");

    // Read 24 bytes from the start of DB18
    let read = plc.read_bytes(&iface, &mut transport, Area::DataBlock, 18, 0, 24)?;
    println!("Read {} bytes from DB18", read);

    // The payload lands in the result buffer; decode values at byte offsets.
    // S7 CPUs store everything big-endian.
    println!("DB18.DBW0  = {}", plc.get_u16(0)?);
    println!("DB18.DBW2  = {} (signed)", plc.get_i16(2)?);
    println!("DB18.DBD4  = {}", plc.get_u32(4)?);
    println!("DB18.DBD10 = {:.2} (REAL)", plc.get_f32(10)?);

    // Raw bytes are available too
    let raw = plc.buffer().get_bytes(0, 8)?;
    println!("First 8 bytes: {:02X?}", raw);

    // =========================================================================
    // Reading Other Areas
    // =========================================================================

    println!("\n=== Reading Other Areas ===\n");

    // Flags (merker). Non-DB areas take 0 as the DB number.
    plc.read_bytes(&iface, &mut transport, Area::Flag, 0, 0, 2)?;
    println!("MW0 = {}", plc.get_u16(0)?);

    // Process image of the inputs
    plc.read_bytes(&iface, &mut transport, Area::Input, 0, 0, 1)?;
    println!("IB0 = 0b{:08b}", plc.get_u8(0)?);

    // Process image of the outputs
    plc.read_bytes(&iface, &mut transport, Area::Output, 0, 0, 1)?;
    println!("QB0 = 0b{:08b}", plc.get_u8(0)?);

    // Counters are 2-byte entries; `start` is the entry number and the
    // length counts bytes, so 6 bytes cover C0 through C2.
    plc.read_bytes(&iface, &mut transport, Area::Counter, 0, 0, 6)?;
    for entry in 0..3 {
        println!("C{} = {}", entry, plc.get_u16(entry * 2)?);
    }

    // =========================================================================
    // Reading Bits
    // =========================================================================

    println!("\n=== Reading Bits ===\n");

    // Read a single bit straight from the CPU (M3.2)
    let running = plc.read_bit(&iface, &mut transport, Area::Flag, 0, 3, 2)?;
    println!("M3.2 = {}", running);

    // Or read a byte and pick bits out of the buffer without extra traffic
    plc.read_bytes(&iface, &mut transport, Area::Flag, 0, 3, 1)?;
    println!("MB3 = 0b{:08b}", plc.get_u8(0)?);
    for bit in 0..8 {
        if plc.get_bit(0, bit)? {
            println!("  M3.{} is ON", bit);
        }
    }

    // =========================================================================
    // Multiple Items in One Request
    // =========================================================================

    println!("\n=== Multiple Items ===\n");

    // Independent addresses travel in a single PDU; each item answers
    // with its own payload or its own error.
    let items = vec![
        RequestItem::bytes(Area::DataBlock, 18, 0, 2)?,
        RequestItem::bytes(Area::Flag, 0, 0, 2)?,
        RequestItem::bit(Area::Input, 0, 0, 5)?,
    ];
    let results = plc.read_multi(&iface, &mut transport, items)?;
    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(payload) => println!("Item {}: {:02X?}", index, payload),
            Err(err) => println!("Item {}: {}", index, err),
        }
    }

    // =========================================================================
    // Disconnect
    // =========================================================================

    plc.disconnect()?;
    println!("\nRead example completed!");
    Ok(())
}
