use tracing::debug;

use super::{Connector, StoreAddress, StoreConnection};
use crate::error::StoreError;

/// Opens plain TCP connections with the synchronous `redis` client.
///
/// No timeouts are set; a hanging server blocks the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnector;

impl RedisConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for RedisConnector {
    fn open(&self, address: &StoreAddress) -> Result<Box<dyn StoreConnection>, StoreError> {
        // Credentials are left out of the URL; AUTH is sent explicitly.
        let client = redis::Client::open(address.connection_url())?;
        let conn = client.get_connection()?;
        debug!(host = %address.host, port = address.port, "TCP connection established");
        Ok(Box::new(RedisConnection { conn: Some(conn) }))
    }
}

/// A single Redis connection. Dropping the inner connection closes the socket.
pub struct RedisConnection {
    conn: Option<redis::Connection>,
}

impl RedisConnection {
    fn conn(&mut self) -> Result<&mut redis::Connection, StoreError> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Other("connection already closed".to_string()))
    }
}

impl StoreConnection for RedisConnection {
    fn auth(&mut self, password: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        redis::cmd("AUTH").arg(password).query::<()>(conn)?;
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        redis::cmd("SET").arg(key).arg(value).query::<()>(conn)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.conn.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Accepts one client on a free port, answers every command with `+OK`
    /// (or `auth_reply` for AUTH) and returns the commands it received once
    /// the client hangs up.
    fn resp_server(auth_reply: &'static str) -> (StoreAddress, JoinHandle<Vec<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut commands = Vec::new();

            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap_or(0) == 0 {
                    break;
                }
                let argc: usize = header.trim_end().trim_start_matches('*').parse().unwrap();

                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    let mut len = String::new();
                    let mut arg = String::new();
                    reader.read_line(&mut len).unwrap();
                    reader.read_line(&mut arg).unwrap();
                    args.push(arg.trim_end().to_string());
                }

                let reply = if args[0].eq_ignore_ascii_case("AUTH") {
                    auth_reply
                } else {
                    "+OK\r\n"
                };
                writer.write_all(reply.as_bytes()).unwrap();
                commands.push(args);
            }
            commands
        });

        let address = StoreAddress::parse(&format!("127.0.0.1:{port}")).unwrap();
        (address, handle)
    }

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_auth_is_first_command_on_the_wire() {
        let (address, server) = resp_server("+OK\r\n");

        let mut conn = RedisConnector::new().open(&address).unwrap();
        conn.auth("pw").unwrap();
        conn.set("k", "v").unwrap();
        conn.close().unwrap();

        assert_eq!(
            server.join().unwrap(),
            vec![command(&["AUTH", "pw"]), command(&["SET", "k", "v"])]
        );
    }

    #[test]
    fn test_only_set_without_password() {
        let (address, server) = resp_server("+OK\r\n");

        let mut conn = RedisConnector::new().open(&address).unwrap();
        conn.set("images/web", "ami-1").unwrap();
        conn.close().unwrap();

        assert_eq!(
            server.join().unwrap(),
            vec![command(&["SET", "images/web", "ami-1"])]
        );
    }

    #[test]
    fn test_auth_error_reply_is_redis_error() {
        let (address, server) = resp_server("-ERR invalid password\r\n");

        let mut conn = RedisConnector::new().open(&address).unwrap();
        let result = conn.auth("wrong");
        conn.close().unwrap();

        assert!(matches!(result, Err(StoreError::Redis(_))));
        assert_eq!(server.join().unwrap(), vec![command(&["AUTH", "wrong"])]);
    }

    #[test]
    fn test_set_after_close_fails() {
        let (address, server) = resp_server("+OK\r\n");

        let mut conn = RedisConnector::new().open(&address).unwrap();
        conn.close().unwrap();

        assert!(matches!(conn.set("k", "v"), Err(StoreError::Other(_))));
        assert!(server.join().unwrap().is_empty());
    }

    #[test]
    fn test_connect_refused() {
        // Grab a free port, then release it so nothing is listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let address = StoreAddress::parse(&format!("127.0.0.1:{port}")).unwrap();

        let result = RedisConnector::new().open(&address);
        assert!(matches!(result, Err(StoreError::Redis(_))));
    }
}
