/*!
# ASN network protocol

the network side of ASN:

1. the client opens the connection with a [`Hello`]: its version, an
   ephemeral public key and a nonce. Both ends derive the key exchange
   [`CryptoBox`](asn_lib::CryptoBox) from it and the server's long term key.
2. from then on every unit is sealed with the box of the session and sent
   in a length prefixed frame (see [`codec`]).
3. the client logs in with a [`LoginRequest`]; the server acknowledges
   with an [`Ack`] carrying a new public key and nonce, and both ends move
   to the rekeyed box.

This crate does not implement the server's session, only what travels
between the peers.
*/

pub mod codec;
mod handle;
mod hello;
mod pdu;
mod request;

pub use self::{
    handle::Handle,
    hello::{Accepted, Accepting, Hello, Opened},
    pdu::Pdu,
    request::{request, Ack, LoginRequest, Status},
};
