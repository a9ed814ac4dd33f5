use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

enum Parsed {
    Data(String),
    Skipped,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only `data` fields are delivered; comments and other fields are
/// consumed and skipped, since losing a single frame must not be fatal
/// to the stream.
pub struct Sse {
    buf: String,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Read more data from the stream first.
            let mut has_more_data = false;
            if let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            {
                let Ok(s) = str::from_utf8(&bytes) else {
                    return Err(Error::InvalidPayload);
                };
                self.buf.push_str(s);
                has_more_data = true;
            }

            // There are data in the buffer, try to parse events. If the
            // data is not enough to parse an event, we need to read more.
            loop {
                match self.try_parse_event() {
                    Some(Parsed::Data(event)) => return Ok(Some(event)),
                    Some(Parsed::Skipped) => continue,
                    None => break,
                }
            }

            // Abort if no more data available.
            if !has_more_data {
                return Ok(None);
            }
        }
    }

    fn try_parse_event(&mut self) -> Option<Parsed> {
        if self.buf.is_empty() {
            return None;
        }

        // For `end-of-line`, we only handle line feed. And for event, we
        // only handle field.
        //
        // event         = *( comment / field ) end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        // end-of-line   = ( cr lf / cr / lf )
        let eol_idx = self.buf.find("\n\n")?;

        // Parse the field line.
        let field = &self.buf[0..eol_idx];
        let mut field_parts = field.split(": ");
        let header = field_parts.next();
        let data = match (header, field_parts.next()) {
            (Some("data"), Some(data)) => Some(data.to_owned()),
            _ => {
                warn!("skipping unsupported sse field: {field:?}");
                None
            }
        };

        // Consume the bytes from the buffer.
        self.buf.drain(0..eol_idx + 2);

        match data {
            Some(data) => Some(Parsed::Data(data)),
            None => Some(Parsed::Skipped),
        }
    }
}
