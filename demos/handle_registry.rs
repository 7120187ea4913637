//! Example: Driving a session through opaque handles
//!
//! Run with: cargo run --example handle_registry
//!
//! This example demonstrates:
//! - The handle-based surface intended for language bindings
//! - Opening resources and referring to them by u32 handles
//! - Reading and writing without holding Rust references
//!
//! Host languages that cannot hold Rust references (JVM, .NET, scripting
//! runtimes) keep one [`Registry`] per process and pass handles across
//! the boundary instead.

use s7comm::{Area, Registry, DEFAULT_ISO_PORT};
use std::net::{Ipv4Addr, SocketAddr};

fn main() -> s7comm::Result<()> {
    let mut registry = Registry::new();

    // =========================================================================
    // Open Resources
    // =========================================================================

    let addr = SocketAddr::from((Ipv4Addr::new(192, 168, 1, 17), DEFAULT_ISO_PORT));
    let socket = registry.open_socket(addr)?;
    let iface = registry.new_interface("IF1", socket)?;

    // Timeouts arrive in microseconds from binding layers
    registry.set_timeout(iface, 5_000_000)?;

    // MPI address 2, rack 0, slot 2
    let plc = registry.new_connection(iface, 2, 0, 2)?;
    registry.connect_plc(plc)?;
    println!("Connected through handle {}", plc);

    // =========================================================================
    // Read and Decode
    // =========================================================================

    println!("\n=== Read and Decode ===\n");

    // Reads hand the payload back directly
    let bytes = registry.read_bytes(plc, Area::DataBlock, 150, 0, 24)?;
    println!("Read {} bytes from DB150: {:02X?}", bytes.len(), &bytes[..8]);

    // The connection behind the handle still offers the typed accessors
    let conn = registry.connection(plc)?;
    println!("DB150.DBW0  = {}", conn.get_u16(0)?);
    println!("DB150.DBD10 = {:.2}", conn.get_f32(10)?);

    // =========================================================================
    // Write
    // =========================================================================

    println!("\n=== Write ===\n");

    registry.write_bytes(plc, Area::DataBlock, 150, 10, &10.0f32.to_be_bytes())?;
    println!("Wrote REAL 10.0 to DB150.DBD10");

    registry.set_bit(plc, Area::Flag, 0, 0, 2)?;
    println!("Set M0.2");
    registry.clr_bit(plc, Area::Flag, 0, 0, 2)?;
    println!("Cleared M0.2");

    // =========================================================================
    // Tear Down
    // =========================================================================

    // Handles outlive the session; the connection could connect again.
    registry.disconnect_plc(plc)?;
    registry.close_socket(socket)?;
    println!("\nRegistry example completed!");
    Ok(())
}
