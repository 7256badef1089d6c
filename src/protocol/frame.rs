use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Reply sent for a GET miss.
pub const ERR_NOT_FOUND: &str = "-Not found\r\n";
/// Reply sent for an unrecognized verb or wrong arity.
pub const ERR_UNSUPPORTED: &str = "-Protocol not support\r\n";
/// Synthetic reply sent when forwarding to the owning node fails.
pub const ERR_UNREACHABLE: &str = "-Can not connect to destination Node\r\n";

/// A parsed client request.
///
/// The exact bytes that were read off the wire are retained in `raw` so the
/// request can be forwarded to the owning node verbatim, without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub args: Vec<String>,
    pub raw: Vec<u8>,
}

pub fn simple_string(value: &str) -> String {
    format!("+{}\r\n", value)
}

pub fn error(message: &str) -> String {
    format!("-{}\r\n", message)
}

pub fn bulk_string(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

pub fn array_header(len: usize) -> String {
    format!("*{}\r\n", len)
}

/// Encodes a command as an array of bulk strings, the canonical request form.
pub fn command(args: &[&str]) -> String {
    let mut encoded = array_header(args.len());
    for arg in args {
        encoded.push_str(&bulk_string(arg));
    }
    encoded
}

/// Reads one framed request from `reader`.
///
/// Returns `Ok(None)` on a clean EOF between requests. EOF in the middle of a
/// request, a missing CRLF terminator, or a malformed length are errors; the
/// stream position is indeterminate afterwards and the session should end.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    let first = match read_line(reader, &mut raw).await? {
        Some(line) => line,
        None => return Ok(None),
    };

    if let Some(rest) = first.strip_prefix('*') {
        let count: usize = rest.parse().context("invalid array length")?;
        if count == 0 {
            bail!("empty command array");
        }
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let header = read_line(reader, &mut raw)
                .await?
                .context("connection closed inside a request")?;
            let len: usize = header
                .strip_prefix('$')
                .context("expected a bulk string")?
                .parse()
                .context("invalid bulk string length")?;
            let mut body = vec![0u8; len + 2];
            reader.read_exact(&mut body).await?;
            raw.extend_from_slice(&body);
            if &body[len..] != b"\r\n" {
                bail!("bulk string not terminated with CRLF");
            }
            body.truncate(len);
            args.push(String::from_utf8(body).context("argument is not valid utf-8")?);
        }
        Ok(Some(Request { args, raw }))
    } else {
        // Inline form: one line of whitespace-separated words.
        let args: Vec<String> = first.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            bail!("empty inline command");
        }
        Ok(Some(Request { args, raw }))
    }
}

/// Reads exactly one framed reply from `reader`, appending its raw bytes to
/// `out`.
///
/// Handles simple strings, errors, bulk strings (including `$-1` nil) and
/// arrays of those. Used when relaying a reply read back from a peer.
pub async fn read_reply<R>(reader: &mut R, out: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let header = read_line(reader, out)
        .await?
        .context("connection closed before reply")?;
    match header.as_bytes().first() {
        Some(b'+') | Some(b'-') => Ok(()),
        Some(b'$') => read_bulk_body(reader, &header, out).await,
        Some(b'*') => {
            let count: usize = header[1..].parse().context("invalid array length")?;
            for _ in 0..count {
                let element = read_line(reader, out)
                    .await?
                    .context("connection closed inside an array reply")?;
                match element.as_bytes().first() {
                    Some(b'+') | Some(b'-') => {}
                    Some(b'$') => read_bulk_body(reader, &element, out).await?,
                    _ => bail!("unsupported array element type"),
                }
            }
            Ok(())
        }
        _ => bail!("unrecognized reply type"),
    }
}

async fn read_bulk_body<R>(reader: &mut R, header: &str, out: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let len: i64 = header[1..].parse().context("invalid bulk string length")?;
    if len < 0 {
        // $-1 nil bulk string has no body.
        return Ok(());
    }
    let mut body = vec![0u8; len as usize + 2];
    reader.read_exact(&mut body).await?;
    if !body.ends_with(b"\r\n") {
        bail!("bulk string not terminated with CRLF");
    }
    out.extend_from_slice(&body);
    Ok(())
}

/// Reads one CRLF-terminated line, without the terminator. Appends the bytes
/// read (terminator included) to `raw`. `None` means EOF before any byte.
async fn read_line<R>(reader: &mut R, raw: &mut Vec<u8>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    raw.extend_from_slice(&line);
    if !line.ends_with(b"\r\n") {
        bail!("line not terminated with CRLF");
    }
    line.truncate(line.len() - 2);
    Ok(Some(String::from_utf8(line).context("line is not valid utf-8")?))
}
