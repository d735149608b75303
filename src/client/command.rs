//! Commands as sent to a node

/// A command name plus binary-safe arguments.
///
/// The first argument is the routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Routing key, if the command has one
    pub fn key(&self) -> Option<&[u8]> {
        self.args.first().map(Vec::as_slice)
    }

    /// RESP encoding, as written to the socket
    pub fn packed(&self) -> Vec<u8> {
        let mut cmd = redis::cmd(&self.name);
        for arg in &self.args {
            cmd.arg(arg.as_slice());
        }
        cmd.get_packed_command()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(key) = self.key() {
            write!(f, " {}", String::from_utf8_lossy(key))?;
        }
        Ok(())
    }
}
