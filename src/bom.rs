//! UTF-8 byte order mark handling for input streams.

use std::io::{self, BufReader, Chain, Cursor, Read};

/// The UTF-8 encoded byte order mark
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A byte source with any leading UTF-8 byte order mark removed.
///
/// When no marker was present the peeked bytes are replayed in front of the
/// remaining stream, so nothing is lost.
pub type BomStripped<R> = BufReader<Chain<Cursor<Vec<u8>>, R>>;

/// Peek at most three bytes of `source` and drop them if they are a UTF-8 BOM.
///
/// Short reads from the underlying source are retried until three bytes are
/// available or the source is exhausted.
pub fn strip_bom<R: Read>(mut source: R) -> io::Result<BomStripped<R>> {
    let mut peeked = [0u8; 3];
    let mut filled = 0;

    while filled < peeked.len() {
        match source.read(&mut peeked[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let replay = if filled == UTF8_BOM.len() && peeked == UTF8_BOM {
        Vec::new()
    } else {
        peeked[..filled].to_vec()
    };

    Ok(BufReader::new(Cursor::new(replay).chain(source)))
}
