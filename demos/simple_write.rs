//! Example: Writing data to PLC memory
//!
//! Run with: cargo run --example simple_write
//!
//! This example demonstrates:
//! - Writing byte ranges to data blocks and flags
//! - Encoding typed values for the wire
//! - Setting and clearing individual bits
//! - Verifying writes by reading back

use s7comm::{Area, Connection, ConnectionParams, Interface, TcpTransport, DEFAULT_ISO_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

fn main() -> s7comm::Result<()> {
    // =========================================================================
    // Connect to PLC
    // =========================================================================

    let iface = Interface::new("IF1").with_timeout(Duration::from_secs(5));
    let addr = SocketAddr::from((Ipv4Addr::new(192, 168, 1, 17), DEFAULT_ISO_PORT));
    let mut transport = TcpTransport::connect(addr, iface.timeout())?;

    let mut plc = Connection::new(ConnectionParams::new(0, 2));
    plc.connect(&iface, &mut transport)?;

    // =========================================================================
    // Writing Bytes
    // =========================================================================

    println!("=== Writing Bytes ===\n");

    // Write raw bytes to the start of DB18
    plc.write_bytes(&iface, &mut transport, Area::DataBlock, 18, 0, &[0x00, 0x05])?;
    println!("Wrote 0x0005 to DB18.DBW0");

    // Write a longer run in one call; transfers larger than the negotiated
    // PDU are split into successive requests automatically.
    let zeros = vec![0u8; 400];
    plc.write_bytes(&iface, &mut transport, Area::DataBlock, 18, 24, &zeros)?;
    println!("Cleared 400 bytes from DB18.DBB24");

    // Flags take 0 as the DB number
    plc.write_bytes(&iface, &mut transport, Area::Flag, 0, 10, &[0xAA, 0x55])?;
    println!("Wrote 0xAA55 to MW10");

    // =========================================================================
    // Typed Values
    // =========================================================================

    println!("\n=== Typed Values ===\n");

    // S7 CPUs store everything big-endian; encode with to_be_bytes
    plc.write_bytes(
        &iface,
        &mut transport,
        Area::DataBlock,
        18,
        2,
        &1500u16.to_be_bytes(),
    )?;
    println!("Wrote u16 1500 to DB18.DBW2");

    plc.write_bytes(
        &iface,
        &mut transport,
        Area::DataBlock,
        18,
        4,
        &(-123_456i32).to_be_bytes(),
    )?;
    println!("Wrote i32 -123456 to DB18.DBD4");

    // REAL values are IEEE 754 single precision
    plc.write_bytes(
        &iface,
        &mut transport,
        Area::DataBlock,
        18,
        10,
        &75.5f32.to_be_bytes(),
    )?;
    println!("Wrote REAL 75.5 to DB18.DBD10");

    // =========================================================================
    // Writing Bits
    // =========================================================================

    println!("\n=== Writing Bits ===\n");

    // Set and clear single bits without touching their neighbors
    plc.set_bit(&iface, &mut transport, Area::Flag, 0, 3, 2)?;
    println!("Set M3.2");

    plc.clr_bit(&iface, &mut transport, Area::Flag, 0, 3, 5)?;
    println!("Cleared M3.5");

    // Alternating pattern across one byte
    for bit in 0..8 {
        if bit % 2 == 0 {
            plc.set_bit(&iface, &mut transport, Area::Flag, 0, 20, bit)?;
        } else {
            plc.clr_bit(&iface, &mut transport, Area::Flag, 0, 20, bit)?;
        }
    }
    println!("Set M20 bits 0,2,4,6 and cleared 1,3,5,7");

    // =========================================================================
    // Read Back and Verify
    // =========================================================================

    println!("\n=== Read Back ===\n");

    plc.read_bytes(&iface, &mut transport, Area::DataBlock, 18, 0, 14)?;
    println!("DB18.DBW0  = {}", plc.get_u16(0)?);
    println!("DB18.DBW2  = {}", plc.get_u16(2)?);
    println!("DB18.DBD4  = {}", plc.get_i32(4)?);
    println!("DB18.DBD10 = {:.1}", plc.get_f32(10)?);

    plc.read_bytes(&iface, &mut transport, Area::Flag, 0, 20, 1)?;
    println!("MB20 = 0b{:08b}", plc.get_u8(0)?);

    // =========================================================================
    // Recipe Write Pattern
    // =========================================================================

    println!("\n=== Recipe Write Pattern ===\n");

    struct Recipe {
        id: u16,
        speed: u16,
        temperature: f32,
    }

    let recipe = Recipe {
        id: 42,
        speed: 1500,
        temperature: 75.5,
    };

    // Pack the whole recipe into one image and write it in a single call
    let mut image = Vec::new();
    image.extend_from_slice(&recipe.id.to_be_bytes());
    image.extend_from_slice(&recipe.speed.to_be_bytes());
    image.extend_from_slice(&recipe.temperature.to_be_bytes());
    plc.write_bytes(&iface, &mut transport, Area::DataBlock, 150, 0, &image)?;
    println!("Wrote recipe {} to DB150", recipe.id);

    plc.disconnect()?;
    println!("\nWrite example completed!");
    Ok(())
}
