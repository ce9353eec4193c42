/// Reassembles raw byte chunks into complete text lines.
///
/// The serial stack delivers arbitrarily-sized chunks; one logical frame is
/// one newline-terminated line. Carriage returns are stripped and blank
/// lines dropped, so a CRLF device and a bare-LF device look the same
/// downstream.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: String,
}

impl LineAssembler {
    /// Feed a chunk, returning every line completed by it. A partial
    /// trailing line is held until the next chunk.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let raw: String = self.pending.drain(..=pos).collect();
            let line = raw.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}
