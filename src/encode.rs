use crate::{END, ESC, ESC_END, ESC_ESC};

/// Encodes one datagram into a complete frame.
///
/// The datagram is treated as opaque binary data: the escape byte is
/// substituted before the delimiter byte, then the escaped body is wrapped
/// between one leading and one trailing delimiter. Encoding is stateless;
/// an empty datagram yields the two-byte frame `0xC0 0xC0`, which a
/// receiver discards as an empty frame.
#[must_use]
pub fn encode(datagram: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(datagram.len() + 2);
    frame.push(END);
    escape_into(datagram, &mut frame);
    frame.push(END);
    frame
}

/// Appends the escaped form of `datagram` to `out`.
///
/// Substituting per byte is equivalent to escaping `ESC` over the whole
/// body first and `END` second; doing it the other way round would escape
/// the `ESC` bytes the first substitution just inserted.
fn escape_into(datagram: &[u8], out: &mut Vec<u8>) {
    for &byte in datagram {
        match byte {
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            END => out.extend_from_slice(&[ESC, ESC_END]),
            _ => out.push(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_plain_datagram() {
        assert_eq!(encode(b"hi"), [END, b'h', b'i', END]);
    }

    #[test]
    fn encode_empty_datagram() {
        assert_eq!(encode(&[]), [END, END]);
    }

    #[test]
    fn encode_escapes_delimiter() {
        assert_eq!(encode(&[END]), [END, ESC, ESC_END, END]);
    }

    #[test]
    fn encode_escapes_escape_byte() {
        assert_eq!(encode(&[ESC]), [END, ESC, ESC_ESC, END]);
    }

    #[test]
    fn encode_mixed_payload() {
        assert_eq!(
            encode(&[0x01, END, 0x02, ESC, 0x03]),
            [END, 0x01, ESC, ESC_END, 0x02, ESC, ESC_ESC, 0x03, END]
        );
    }

    #[test]
    fn encode_adjacent_sentinels() {
        // An ESC directly before an END must not merge into one sequence.
        assert_eq!(encode(&[ESC, END]), [END, ESC, ESC_ESC, ESC, ESC_END, END]);
    }
}
