//! Interactive console input.
//!
//! Reads one line at a time behind a prompt. `exit`, `quit` and `bye`
//! (any case) end a session, as does end of input.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub const EXIT_SENTINELS: [&str; 3] = ["exit", "quit", "bye"];

/// Whether the input asks to end the session.
pub fn is_exit_sentinel(input: &str) -> bool {
    let input = input.trim();
    EXIT_SENTINELS
        .iter()
        .any(|sentinel| input.eq_ignore_ascii_case(sentinel))
}

/// Line-oriented prompt over any async reader and writer.
pub struct Console<R, W> {
    reader: R,
    writer: W,
}

impl Console<BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Print `prompt` and read one line.
    ///
    /// Returns `None` at end of input. The line is trimmed.
    pub async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Next non-empty input of a session.
    ///
    /// Returns `None` on an exit sentinel or end of input.
    pub async fn next_input(&mut self, prompt: &str) -> io::Result<Option<String>> {
        loop {
            match self.read_line(prompt).await? {
                None => return Ok(None),
                Some(line) if is_exit_sentinel(&line) => return Ok(None),
                Some(line) if line.is_empty() => continue,
                Some(line) => return Ok(Some(line)),
            }
        }
    }

    /// Write one line of output.
    pub async fn say(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    #[cfg(test)]
    pub(crate) fn into_writer(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_sentinels() {
        assert!(is_exit_sentinel("exit"));
        assert!(is_exit_sentinel("  QUIT \n"));
        assert!(is_exit_sentinel("Bye"));
        assert!(!is_exit_sentinel("goodbye"));
        assert!(!is_exit_sentinel("exit now"));
    }

    #[tokio::test]
    async fn test_next_input_skips_blank_lines_and_stops_on_sentinel() {
        let input: &[u8] = b"\n  hello there \nquit\nnever read\n";
        let mut console = Console::new(input, Vec::new());

        assert_eq!(
            console.next_input("You: ").await.unwrap(),
            Some("hello there".to_string())
        );
        assert_eq!(console.next_input("You: ").await.unwrap(), None);

        let written = String::from_utf8(console.into_writer()).unwrap();
        assert_eq!(written, "You: You: You: ");
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let input: &[u8] = b"last line";
        let mut console = Console::new(input, Vec::new());

        assert_eq!(
            console.next_input("> ").await.unwrap(),
            Some("last line".to_string())
        );
        assert_eq!(console.next_input("> ").await.unwrap(), None);
        assert_eq!(console.read_line("> ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_say() {
        let mut console = Console::new(&b""[..], Vec::new());
        console.say("Agent: hi").await.unwrap();
        assert_eq!(console.into_writer(), b"Agent: hi\n".to_vec());
    }
}
