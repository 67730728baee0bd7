//! Messages and the packet codec.
//!
//! Wire format of a message payload:
//! ```text
//! frame  = [flag: u8][body]                 (see compression module)
//! body   = array(2) [packet_type: str, root]
//! root   = type-directed encoding of the packet value
//! ```
//!
//! The delivery method travels beside the payload, never inside it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::*;

use super::compression::{CompressionConfig, Compressor};
use super::formatter::FormatterRegistry;
use super::structural::{Decoder, Encoder, Wire};
use super::wire::WireReader;

/// Delivery semantics requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryMethod {
    /// Latest-wins, may drop.
    UnreliableSequenced,
    /// Every message, in order.
    #[default]
    ReliableOrdered,
}

impl DeliveryMethod {
    /// Stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::UnreliableSequenced => "unreliable_sequenced",
            DeliveryMethod::ReliableOrdered => "reliable_ordered",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unreliable_sequenced" => Ok(DeliveryMethod::UnreliableSequenced),
            "reliable_ordered" => Ok(DeliveryMethod::ReliableOrdered),
            _ => Err(()),
        }
    }
}

/// An encoded packet plus its delivery tag. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Vec<u8>,
    delivery: DeliveryMethod,
}

impl Message {
    /// Wrap raw payload bytes received from the transport.
    pub fn new(payload: Vec<u8>, delivery: DeliveryMethod) -> Self {
        Self { payload, delivery }
    }

    /// The framed payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Delivery semantics.
    pub fn delivery(&self) -> DeliveryMethod {
        self.delivery
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consume and get the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Codec configuration.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Compression wrapper settings.
    pub compression: CompressionConfig,
    /// Attempt compression on outbound messages.
    pub compress: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            compress: cfg!(feature = "compression"),
        }
    }
}

/// Encodes packets into messages and back.
///
/// Cheap to clone; the formatter table is shared.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    registry: Arc<FormatterRegistry>,
    compressor: Compressor,
    compress: bool,
}

impl PacketCodec {
    /// Create a codec over a frozen formatter table.
    pub fn new(registry: Arc<FormatterRegistry>) -> Self {
        Self::with_config(registry, CodecConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(registry: Arc<FormatterRegistry>, config: CodecConfig) -> Self {
        Self {
            registry,
            compressor: Compressor::with_config(config.compression),
            compress: config.compress,
        }
    }

    /// The formatter table.
    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Type-directed encoding of `value` declared as `T`, without framing.
    pub fn serialize<T: Wire>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new(&self.registry);
        enc.value(value)?;
        Ok(enc.into_bytes())
    }

    /// Decode bytes produced by [`PacketCodec::serialize`] as a `T`.
    ///
    /// The whole buffer must be consumed.
    pub fn deserialize<T: Wire>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let mut dec = Decoder::new(&self.registry, bytes);
        let value = dec.value()?;
        dec.finish()?;
        Ok(value)
    }

    /// Encode a packet into a framed message.
    pub fn encode<P: Packet>(&self, packet: &P) -> Result<Message, CodecError> {
        let mut enc = Encoder::new(&self.registry);
        enc.writer().write_array_len(PACKET_ENVELOPE_LEN);
        enc.name(P::PACKET_TYPE);
        enc.value(packet)?;
        let body = enc.into_bytes();

        let frame = self.compressor.wrap(&body, self.compress)?;
        Ok(Message::new(frame, packet.delivery()))
    }

    /// Decode a message that must carry a `P`.
    pub fn decode<P: Packet>(&self, message: &Message) -> Result<P, CodecError> {
        let body = self.compressor.unwrap_frame(message.payload())?;
        let mut dec = Decoder::new(&self.registry, &body);

        let found = read_envelope(dec.reader())?;
        if found != P::PACKET_TYPE {
            return Err(DecodeError::PacketMismatch {
                expected: P::PACKET_TYPE,
                found: found.to_string(),
            }
            .into());
        }

        let packet = dec.value()?;
        dec.finish()?;
        Ok(packet)
    }

    /// Read the packet type name without decoding the body.
    pub fn peek_type(&self, message: &Message) -> Result<String, CodecError> {
        let body = self.compressor.unwrap_frame(message.payload())?;
        let mut reader = WireReader::new(&body);
        Ok(read_envelope(&mut reader)?.to_string())
    }
}

fn read_envelope<'a>(reader: &mut WireReader<'a>) -> Result<&'a str, DecodeError> {
    if reader.is_nil() {
        return Err(DecodeError::NullValue { type_name: "packet" });
    }
    let len = reader.read_array_len()?;
    if len != PACKET_ENVELOPE_LEN {
        return Err(DecodeError::UnexpectedMarker {
            expected: "packet envelope of 2 elements",
            found: MARKER_FIXARRAY | len.min(0x0f) as u8,
        });
    }
    reader.read_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Quaternion, Vector3};

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        seq: u32,
        at: Vector3,
    }

    impl Wire for Ping {
        fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
            enc.begin_struct(2);
            enc.value(&self.seq)?;
            enc.value(&self.at)
        }

        fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
            let mut s = dec.begin_struct::<Self>()?;
            let value = Self {
                seq: s.field()?,
                at: s.field_or_default()?,
            };
            s.finish()?;
            Ok(value)
        }
    }

    impl Packet for Ping {
        const PACKET_TYPE: &'static str = "ping";
        const DELIVERY: DeliveryMethod = DeliveryMethod::UnreliableSequenced;
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Turn(Quaternion);

    impl Wire for Turn {
        fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
            enc.value(&self.0)
        }

        fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
            dec.value().map(Turn)
        }
    }

    impl Packet for Turn {
        const PACKET_TYPE: &'static str = "turn";
    }

    fn codec() -> PacketCodec {
        PacketCodec::new(Arc::new(FormatterRegistry::standard()))
    }

    #[test]
    fn test_packet_roundtrip_and_delivery() {
        let codec = codec();
        let ping = Ping {
            seq: 9,
            at: Vector3::new(1.0, -2.0, 3.5),
        };

        let message = codec.encode(&ping).unwrap();
        assert_eq!(message.delivery(), DeliveryMethod::UnreliableSequenced);
        assert_eq!(codec.peek_type(&message).unwrap(), "ping");
        assert_eq!(codec.decode::<Ping>(&message).unwrap(), ping);
    }

    #[test]
    fn test_default_delivery_is_reliable() {
        let message = codec().encode(&Turn(Quaternion::IDENTITY)).unwrap();
        assert_eq!(message.delivery(), DeliveryMethod::ReliableOrdered);
    }

    #[test]
    fn test_wrong_packet_type() {
        let codec = codec();
        let message = codec.encode(&Turn(Quaternion::IDENTITY)).unwrap();
        let err = codec.decode::<Ping>(&message).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode(DecodeError::PacketMismatch { expected: "ping", .. })
        ));
    }

    #[test]
    fn test_missing_formatter_on_receiver() {
        let sender = codec();
        let receiver = PacketCodec::new(Arc::new(FormatterRegistry::empty()));

        let message = sender.encode(&Turn(Quaternion::IDENTITY)).unwrap();
        let err = receiver.decode::<Turn>(&message).unwrap_err();
        assert!(matches!(err, CodecError::FormatterMissing { .. }));
    }

    #[test]
    fn test_truncated_message_rejected() {
        let codec = codec();
        let message = codec
            .encode(&Ping {
                seq: 1,
                at: Vector3::ZERO,
            })
            .unwrap();

        let mut payload = message.into_payload();
        payload.truncate(payload.len() - 2);
        let truncated = Message::new(payload, DeliveryMethod::ReliableOrdered);

        let err = codec.decode::<Ping>(&truncated).unwrap_err();
        assert_eq!(err, CodecError::Decode(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_serialize_declared_type() {
        let codec = codec();
        let bytes = codec.serialize(&Quaternion::IDENTITY).unwrap();
        assert_eq!(bytes.len(), 1 + 4 * 5);
        assert_eq!(
            codec.deserialize::<Quaternion>(&bytes).unwrap(),
            Quaternion::IDENTITY
        );
    }

    #[test]
    fn test_delivery_names() {
        for method in [DeliveryMethod::ReliableOrdered, DeliveryMethod::UnreliableSequenced] {
            assert_eq!(method.as_str().parse::<DeliveryMethod>(), Ok(method));
        }
        assert_eq!(DeliveryMethod::default(), DeliveryMethod::ReliableOrdered);
    }
}
