//! # S7 Communication Library
//!
//! A Rust library for communicating with Siemens S7 PLCs over ISO-on-TCP
//! (RFC 1006), speaking the S7 protocol: COTP handshake, PDU length
//! negotiation, and read/write/bit operations on the CPU's memory areas.
//!
//! This is a **protocol-only** library—no polling, schedulers, tag databases,
//! or application-level features. Each operation is exactly one job PDU and
//! its ack-data response, exchanged in lock-step. No automatic retries,
//! caching, or reconnection.
//!
//! ## Features
//!
//! - **Protocol-only** — COTP handshake, PDU negotiation, read/write and bit
//!   operations; nothing above the wire
//! - **Deterministic** — one request, one response; transfers beyond one PDU
//!   are split at visible, documented boundaries
//! - **Type-safe** — memory areas as enums, request items validated at
//!   construction
//! - **No panics** — all errors returned as `Result<T, S7Error>`
//! - **Typed access** — big-endian integers, floats, and bits decoded
//!   straight from the result buffer
//! - **Binding-ready** — an opaque-handle [`Registry`] mirroring the classic
//!   handle-based driver surface
//!
//! ## Quick Start
//!
//! ```no_run
//! use s7comm::{Area, Connection, ConnectionParams, Interface, TcpTransport};
//!
//! fn main() -> s7comm::Result<()> {
//!     // ISO-TCP endpoint of the CPU; port 102 by convention
//!     let iface = Interface::new("IF1");
//!     let addr = "192.168.0.10:102".parse().unwrap();
//!     let mut transport = TcpTransport::connect(addr, iface.timeout())?;
//!
//!     // CPU in rack 0, slot 2
//!     let mut conn = Connection::new(ConnectionParams::new(0, 2));
//!     conn.connect(&iface, &mut transport)?;
//!
//!     // Read 24 bytes from DB150 and decode fields in place
//!     conn.read_bytes(&iface, &mut transport, Area::DataBlock, 150, 0, 24)?;
//!     let status = conn.get_u16(0)?;
//!     let flow = conn.get_f32(4)?;
//!     println!("status = {status}, flow = {flow}");
//!
//!     // Toggle flag M0.2
//!     conn.set_bit(&iface, &mut transport, Area::Flag, 0, 0, 2)?;
//!     conn.clr_bit(&iface, &mut transport, Area::Flag, 0, 0, 2)?;
//!
//!     conn.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Memory Areas
//!
//! The library addresses the following S7 memory areas:
//!
//! | Area | Description | Byte Access | Bit Access |
//! |------|-------------|:-----------:|:----------:|
//! | [`Area::Input`] | Process image of inputs | ✓ | ✓ |
//! | [`Area::Output`] | Process image of outputs | ✓ | ✓ |
//! | [`Area::Flag`] | Flag memory (merkers) | ✓ | ✓ |
//! | [`Area::DataBlock`] | Numbered data blocks | ✓ | ✓ |
//! | [`Area::InstanceDataBlock`] | Instance data of function blocks | ✓ | ✓ |
//! | [`Area::DirectPeripheral`] | Peripheral access bypassing the process image | ✓ | ✓ |
//! | [`Area::Counter`] | S7 counters, one 2-byte entry each | ✓ | ✗ |
//! | [`Area::Timer`] | S7 timers, one 2-byte entry each | ✓ | ✗ |
//!
//! ## Ownership
//!
//! The socket belongs to the caller from start to finish. An [`Interface`]
//! carries configuration (name, variant, timeout) and a [`Connection`]
//! carries session state; every operation borrows both the interface and the
//! [`TcpTransport`] for its full duration. One transport therefore carries
//! one request at a time, checked at compile time, which is exactly the
//! serialization the protocol demands.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, S7Error>`](S7Error). The library never
//! panics in public code.
//!
//! ```no_run
//! use s7comm::{Area, Connection, ConnectionParams, Interface, S7Error, TcpTransport};
//!
//! # fn main() -> s7comm::Result<()> {
//! let iface = Interface::new("IF1");
//! let addr = "192.168.0.10:102".parse().unwrap();
//! let mut transport = TcpTransport::connect(addr, iface.timeout())?;
//! let mut conn = Connection::new(ConnectionParams::new(0, 2));
//! conn.connect(&iface, &mut transport)?;
//!
//! match conn.read_bytes(&iface, &mut transport, Area::DataBlock, 18, 0, 4) {
//!     Ok(read) => println!("read {read} bytes"),
//!     Err(S7Error::Timeout) => println!("Communication timeout"),
//!     Err(S7Error::AddressOutOfRange) => println!("No such address in DB18"),
//!     Err(S7Error::PlcFailure { code }) => println!("PLC error: code 0x{code:04X}"),
//!     Err(e) => println!("Error: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Transport and protocol errors drop the connection back to
//! [`ConnectionState::Disconnected`]; errors the PLC reports about a request
//! (wrong address, inaccessible area) leave the session usable.
//!
//! ## Configuration
//!
//! ```
//! use std::time::Duration;
//! use s7comm::{ConnectionParams, ConnectionType, Interface};
//!
//! let iface = Interface::new("line-3")
//!     .with_timeout(Duration::from_secs(5));      // default: 2s
//!
//! let params = ConnectionParams::new(0, 2)
//!     .with_mpi(2)                                // default: 2
//!     .with_connection_type(ConnectionType::Op);  // default: PG
//! ```
//!
//! ## Language Bindings
//!
//! Foreign callers that can only pass integers across their boundary use the
//! [`Registry`], which owns sockets, interfaces, and connections behind
//! opaque handles:
//!
//! ```no_run
//! use s7comm::{Area, Registry};
//!
//! let mut registry = Registry::new();
//! let socket = registry.open_socket("192.168.0.10:102".parse().unwrap())?;
//! let iface = registry.new_interface("IF1", socket)?;
//! registry.set_timeout(iface, 5_000_000)?;
//!
//! let plc = registry.new_connection(iface, 2, 0, 2)?;
//! registry.connect_plc(plc)?;
//! let bytes = registry.read_bytes(plc, Area::DataBlock, 150, 0, 24)?;
//! registry.disconnect_plc(plc)?;
//! # let _ = bytes;
//! # Ok::<(), s7comm::S7Error>(())
//! ```
//!
//! ## Design Philosophy
//!
//! This library follows the principle of **determinism over abstraction**:
//!
//! 1. One call is one PDU exchange; nothing happens behind the caller's back
//! 2. Session state is explicit and inspectable
//! 3. Retry, caching, and reconnection policy belong to the application
//! 4. Errors are explicit and descriptive, never panics

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod area;
pub mod buffer;
mod client;
pub mod command;
pub mod cotp;
mod error;
mod registry;
pub mod response;
mod transport;

// Public re-exports
pub use area::Area;
pub use buffer::{ResultBuffer, RESULT_BUFFER_CAPACITY};
pub use client::{
    Connection, ConnectionParams, ConnectionState, Interface, ProtocolVariant, DEFAULT_MPI_ADDRESS,
};
pub use command::{RequestItem, MAX_ITEMS_PER_REQUEST, PROPOSED_PDU_LENGTH};
pub use cotp::ConnectionType;
pub use error::{Result, S7Error};
pub use registry::Registry;
pub use transport::{TcpTransport, DEFAULT_ISO_PORT, DEFAULT_TIMEOUT};
