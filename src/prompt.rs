//! Interactive prompts

use std::io::{self, BufRead, Write};

/// Print `prompt` and read one trimmed line from stdin
pub fn read_line(prompt: &str) -> io::Result<String> {
    let stdin = io::stdin();
    read_line_from(&mut stdin.lock(), &mut io::stdout(), prompt)
}

/// Read a password without echoing it
pub fn read_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

fn read_line_from<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> io::Result<String> {
    write!(out, "{}", prompt)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no input"));
    }
    Ok(line.trim().to_string())
}
