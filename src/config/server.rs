// ABOUTME: SSH address shorthand used by host entries in the config file.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
}

impl ServerAddress {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        if user_part.is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| format!("invalid port: {}", port_str))?;
                (host, port)
            }
            None => (rest, 22),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerAddress {
            host: host.to_string(),
            port,
            user: user_part.map(str::to_string),
        })
    }
}
