/*!
# session of a peer

a session lives as long as the connection of the peer. It is driven by
the units received on that connection, one at a time:

```text
              login           pause
Unestablished ─────▶ Established ────▶ Suspended
                         ▲     ◀────────┘
                         │       resume
                         └── login
any ──── quit ───▶ Quitting
```

login and resume rekey the session: the server draws a new ephemeral
key pair and a nonce, acknowledges with them (sealed with the box in
force) and installs the new box.
*/

use crate::{server::Context, SessionError};
use asn_lib::{
    encr_keypair, Blob, CryptoBox, EncrPub, Generation, Id, Nonce, Recycle, Requester, Sum,
};
use asn_network::{Ack, LoginRequest, Pdu};
use bytes::Bytes;
use rand::rngs::OsRng;
use std::{
    collections::VecDeque,
    fmt::{self, Formatter},
    path::PathBuf,
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Unestablished,
    Established,
    Suspended,
    Quitting,
}

/// role of the peer, resolved at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Server,
    User,
}

/// what [`Session::dispatch`] did of the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Login,
    Pause,
    Resume,
    Quit,
    Blob(Ingested),
}

/// outcome of a blob upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// the blob is now stored at the given path
    Stored(PathBuf),
    /// the blob was already stored at the given path, nothing was written
    Duplicate(PathBuf),
}

pub struct Session {
    context: Arc<Context>,
    data: SessionData,
}

/// the reusable part of a [`Session`], see [`Context`]'s pool
#[derive(Default)]
pub(crate) struct SessionData {
    state: State,
    role: Option<Role>,
    name: String,
    keys: Keys,
    crypto_box: Option<CryptoBox>,
    lat: i32,
    lon: i32,
    range: i32,
    outbound: VecDeque<Bytes>,
}

#[derive(Default)]
struct Keys {
    server_ephemeral: Option<EncrPub>,
    client_ephemeral: Option<EncrPub>,
    client_login: Option<EncrPub>,
}

impl Session {
    pub fn new(context: Arc<Context>) -> Self {
        let mut data = context.sessions.take();
        data.name.push_str(&context.config.name);

        Self { context, data }
    }

    pub fn state(&self) -> State {
        self.data.state
    }

    pub fn role(&self) -> Option<Role> {
        self.data.role
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// login key of the peer, once logged in
    pub fn login(&self) -> Option<&EncrPub> {
        self.data.keys.client_login.as_ref()
    }

    /// ephemeral key of the peer, from the hello
    pub fn ephemeral(&self) -> Option<&EncrPub> {
        self.data.keys.client_ephemeral.as_ref()
    }

    /// our ephemeral key of the last rekey
    pub fn server_ephemeral(&self) -> Option<&EncrPub> {
        self.data.keys.server_ephemeral.as_ref()
    }

    pub fn crypto_box(&self) -> Option<&CryptoBox> {
        self.data.crypto_box.as_ref()
    }

    /// latitude, longitude and range of the peer, in micro degrees
    pub fn location(&self) -> (i32, i32, i32) {
        (self.data.lat, self.data.lon, self.data.range)
    }

    pub fn set_location(&mut self, lat: i32, lon: i32, range: i32) {
        self.data.lat = lat;
        self.data.lon = lon;
        self.data.range = range;
    }

    /// install the key exchange box agreed in the hello of the peer
    pub fn key_exchange(&mut self, ephemeral: EncrPub, crypto_box: CryptoBox) {
        self.data.keys.client_ephemeral = Some(ephemeral);
        self.data.crypto_box = Some(crypto_box);
    }

    /// open a sealed unit received from the peer
    pub fn receive(&mut self, sealed: &[u8]) -> Result<Pdu, SessionError> {
        let crypto_box = self
            .data
            .crypto_box
            .as_mut()
            .ok_or(SessionError::MissingKeyExchange)?;

        Ok(Pdu::from(crypto_box.open(sealed)?))
    }

    /// next sealed acknowledgment to send to the peer
    pub fn next_outbound(&mut self) -> Option<Bytes> {
        self.data.outbound.pop_front()
    }

    /// read the header of the unit and hand it to its handler
    pub fn dispatch(&mut self, mut pdu: Pdu) -> Result<Dispatched, SessionError> {
        let header = pdu.header()?;

        match header.id {
            Id::Incompatible => Err(SessionError::Incompatible(header.version)),
            Id::Unknown => Err(SessionError::UnknownId(header.raw)),
            Id::LoginReq => self.handle_login(pdu).map(|()| Dispatched::Login),
            Id::PauseReq => self.handle_pause(pdu).map(|()| Dispatched::Pause),
            Id::ResumeReq => self.handle_resume(pdu).map(|()| Dispatched::Resume),
            Id::QuitReq => self.handle_quit(pdu).map(|()| Dispatched::Quit),
            Id::Blob => self.handle_blob(pdu).map(Dispatched::Blob),
            id => Err(SessionError::Unsupported(id)),
        }
    }

    /// authenticate the peer and rekey the session
    ///
    /// the unit is positioned after its header. On failure the peer is
    /// acknowledged with a failure status and the session is unchanged.
    pub fn handle_login(&mut self, mut pdu: Pdu) -> Result<(), SessionError> {
        self.ensure_not_quitting()?;
        if self.data.keys.client_ephemeral.is_none() {
            return Err(SessionError::MissingKeyExchange);
        }

        let request = LoginRequest::read_from(&mut pdu).map_err(|source| SessionError::Request {
            id: Id::LoginReq,
            source,
        })?;

        let keys = &self.context.config.keys;
        let (role, signing_key) = if request.login == keys.admin.encr {
            (Role::Admin, Some(keys.admin.auth))
        } else if request.login == keys.server.encr {
            (Role::Server, Some(keys.server.auth))
        } else {
            (
                Role::User,
                self.context.directory.signing_key(&request.login),
            )
        };

        let verified = signing_key
            .map(|key| request.signature.verify(&key, request.login.as_ref()))
            .unwrap_or(false);

        if !verified {
            tracing::warn!(
                session = %self.name(),
                login = %request.login.short(),
                ?role,
                "login failed"
            );
            self.send(Ack::failure(request.requester))?;
            return Err(SessionError::AuthenticationFailed {
                login: request.login,
            });
        }

        self.data.role = Some(role);
        self.data.keys.client_login = Some(request.login);
        self.data.name.clear();
        self.data.name.push_str(&self.context.config.name);
        match role {
            Role::Admin => self.data.name.push_str("[Admin]"),
            Role::Server => self.data.name.push_str("[Server]"),
            Role::User => {
                self.data.name.push('[');
                self.data.name.push_str(&request.login.short());
                self.data.name.push(']');
            }
        }

        tracing::info!(session = %self.name(), ?role, "login");

        self.rekey(request.requester)
    }

    /// suspend an established session
    pub fn handle_pause(&mut self, mut pdu: Pdu) -> Result<(), SessionError> {
        self.ensure_state(Id::PauseReq, State::Established)?;
        let requester = read_requester(Id::PauseReq, &mut pdu)?;

        tracing::info!(session = %self.name(), "suspending");

        self.send(Ack::success(requester))?;
        self.data.state = State::Suspended;
        Ok(())
    }

    /// resume a suspended session, the peer is not authenticated again
    pub fn handle_resume(&mut self, mut pdu: Pdu) -> Result<(), SessionError> {
        self.ensure_state(Id::ResumeReq, State::Suspended)?;
        let requester = read_requester(Id::ResumeReq, &mut pdu)?;

        tracing::info!(session = %self.name(), "resuming");

        self.rekey(requester)
    }

    /// acknowledge and move to the terminal state, the caller closes the
    /// connection afterward
    pub fn handle_quit(&mut self, mut pdu: Pdu) -> Result<(), SessionError> {
        self.ensure_not_quitting()?;
        let requester = read_requester(Id::QuitReq, &mut pdu)?;

        tracing::info!(session = %self.name(), "quitting");

        self.send(Ack::success(requester))?;
        self.data.state = State::Quitting;
        Ok(())
    }

    /// store the uploaded blob unless it is already stored
    ///
    /// the unit is positioned after its header. Uploading a blob already
    /// stored is not an error: nothing is written.
    pub fn handle_blob(&mut self, pdu: Pdu) -> Result<Ingested, SessionError> {
        self.ensure_state(Id::Blob, State::Established)?;

        let mut blob = self.context.blobs.take();
        let result = self.ingest(&mut blob, pdu);
        self.context.blobs.give(blob);

        result
    }

    fn ingest(&self, blob: &mut Blob, mut pdu: Pdu) -> Result<Ingested, SessionError> {
        blob.read_from(&mut pdu)?;

        pdu.rewind();
        let sum = Sum::of(&mut pdu)?;

        let repos = &self.context.repos;
        let path = repos.path_for(&sum);
        if path.exists() {
            tracing::debug!(session = %self.name(), blob = %blob.name, %sum, "duplicate blob");
            return Ok(Ingested::Duplicate(path));
        }

        let (login, ephemeral) = match (
            self.data.keys.client_login.as_ref(),
            self.data.keys.client_ephemeral.as_ref(),
        ) {
            (Some(login), Some(ephemeral)) => (login, ephemeral),
            _ => {
                return Err(SessionError::InvalidState {
                    id: Id::Blob,
                    state: self.state(),
                })
            }
        };

        if let Err(denied) = self
            .context
            .permission
            .check(self, blob, login, ephemeral)
        {
            tracing::warn!(
                session = %self.name(),
                blob = %blob.name,
                reason = %denied,
                "blob denied"
            );
            return Err(denied.into());
        }

        repos.ensure_parent_dirs(&path)?;
        pdu.save_as(&path)?;

        tracing::info!(session = %self.name(), blob = %blob.name, %sum, "blob stored");

        let name = blob.file_name(&sum);
        self.context
            .notifier
            .ingested(self.name(), blob, &sum, &name, &path);

        Ok(Ingested::Stored(path))
    }

    /// acknowledge `requester` with a new ephemeral key and nonce, then
    /// move to the box derived from them
    ///
    /// the acknowledgment is sealed with the box in force before the rekey.
    pub fn rekey(&mut self, requester: Requester) -> Result<(), SessionError> {
        let client = self
            .data
            .keys
            .client_ephemeral
            .ok_or(SessionError::MissingKeyExchange)?;

        let nonce = Nonce::generate(&mut OsRng);
        let (public, secret) = encr_keypair(&mut OsRng);

        self.send(Ack::rekey(requester, &public, &nonce))?;

        self.data.keys.server_ephemeral = Some(public);
        self.data.state = State::Established;
        self.data.crypto_box = Some(CryptoBox::new(
            Generation::REKEY,
            &nonce,
            &client,
            &public,
            &secret,
        ));

        tracing::info!(session = %self.name(), public = %public.short(), "rekeyed");

        Ok(())
    }

    /// seal the acknowledgment with the box in force and queue it
    fn send(&mut self, ack: Ack) -> Result<(), SessionError> {
        let crypto_box = self
            .data
            .crypto_box
            .as_mut()
            .ok_or(SessionError::MissingKeyExchange)?;

        let sealed = crypto_box.seal(&ack.to_bytes())?;
        self.data.outbound.push_back(Bytes::from(sealed));
        Ok(())
    }

    fn ensure_not_quitting(&self) -> Result<(), SessionError> {
        if self.state() == State::Quitting {
            Err(SessionError::Quitting)
        } else {
            Ok(())
        }
    }

    fn ensure_state(&self, id: Id, expected: State) -> Result<(), SessionError> {
        self.ensure_not_quitting()?;
        if self.state() != expected {
            return Err(SessionError::InvalidState {
                id,
                state: self.state(),
            });
        }
        Ok(())
    }
}

fn read_requester(id: Id, pdu: &mut Pdu) -> Result<Requester, SessionError> {
    Requester::read_from(pdu).map_err(|source| SessionError::Request { id, source })
}

impl Drop for Session {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.context.sessions.give(data);
    }
}

impl Default for State {
    fn default() -> Self {
        Self::Unestablished
    }
}

impl Recycle for SessionData {
    fn recycle(&mut self) {
        self.state = State::Unestablished;
        self.role = None;
        self.name.clear();
        self.keys = Keys::default();
        self.crypto_box = None;
        self.lat = 0;
        self.lon = 0;
        self.range = 0;
        self.outbound.clear();
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unestablished => f.write_str("unestablished"),
            Self::Established => f.write_str("established"),
            Self::Suspended => f.write_str("suspended"),
            Self::Quitting => f.write_str("quitting"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.data.name)
            .field("state", &self.data.state)
            .field("role", &self.data.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ErrorKind, Keys, PeerKeys, ServerKeys};
    use asn_lib::{
        id::{flag_deleted, is_deleted},
        AuthSec, Content, EncrSec, Header, Timestamp, Version,
    };
    use asn_network::request;
    use std::{collections::BTreeMap, fs};
    use tempfile::TempDir;

    struct Peer {
        login: EncrPub,
        auth: AuthSec,
    }

    /// the client end of a session
    struct Client {
        ephemeral: EncrPub,
        secret: asn_lib::EncrSec,
        crypto_box: CryptoBox,
    }

    struct Fixture {
        _dir: TempDir,
        admin: Peer,
        server: Peer,
        user: Peer,
        context: Arc<Context>,
    }

    impl Peer {
        fn new() -> Self {
            let (login, _) = encr_keypair(&mut OsRng);
            Self {
                login,
                auth: AuthSec::generate(&mut OsRng),
            }
        }

        fn login_request(&self, token: u64) -> Pdu {
            LoginRequest::new(Requester::from(token), self.login, &self.auth).to_pdu()
        }
    }

    impl Client {
        fn send(&mut self, session: &mut Session, pdu: Pdu) -> Result<Dispatched, SessionError> {
            let sealed = self.crypto_box.seal(pdu.as_bytes()).unwrap();
            let pdu = session.receive(&sealed)?;
            session.dispatch(pdu)
        }

        fn ack(&mut self, session: &mut Session) -> Ack {
            let sealed = session.next_outbound().expect("an acknowledgment");
            let mut pdu = Pdu::from(self.crypto_box.open(&sealed).unwrap());
            assert_eq!(pdu.header().unwrap().id, Id::AckReq);
            Ack::read_from(&mut pdu).unwrap()
        }

        fn rekeyed(&mut self, ack: &Ack) {
            let (public, nonce) = ack.rekeyed().expect("a rekey acknowledgment");
            self.crypto_box = CryptoBox::new(
                Generation::REKEY,
                &nonce,
                &public,
                &self.ephemeral,
                &self.secret,
            );
        }

        fn login(&mut self, session: &mut Session, peer: &Peer, token: u64) -> Ack {
            let dispatched = self.send(session, peer.login_request(token)).unwrap();
            assert_eq!(dispatched, Dispatched::Login);

            let ack = self.ack(session);
            self.rekeyed(&ack);
            ack
        }
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let admin = Peer::new();
        let user = Peer::new();
        let secret = EncrSec::generate(&mut OsRng);
        let server = Peer {
            login: secret.public(),
            auth: AuthSec::generate(&mut OsRng),
        };

        let mut users = BTreeMap::new();
        users.insert(user.login, user.auth.public());

        let config = Config {
            name: "asnd".to_owned(),
            repos: dir.path().to_path_buf(),
            listen_address: "127.0.0.1:0".parse().unwrap(),
            keys: Keys {
                admin: PeerKeys {
                    encr: admin.login,
                    auth: admin.auth.public(),
                },
                server: ServerKeys {
                    encr: server.login,
                    auth: server.auth.public(),
                    secret,
                },
            },
            users,
            pool_size: 4,
        };

        Fixture {
            _dir: dir,
            admin,
            server,
            user,
            context: Arc::new(Context::new(config)),
        }
    }

    /// a session right after the hello of a new client
    fn connect(fixture: &Fixture) -> (Session, Client) {
        let (ephemeral, secret) = encr_keypair(&mut OsRng);
        let nonce = Nonce::generate(&mut OsRng);
        let server = &fixture.context.config.keys.server;

        let client_box = CryptoBox::new(
            Generation::KEY_EXCHANGE,
            &nonce,
            &server.encr,
            &ephemeral,
            &secret,
        );
        let server_box = CryptoBox::new(
            Generation::KEY_EXCHANGE,
            &nonce,
            &ephemeral,
            &server.encr,
            &server.secret,
        );

        let mut session = Session::new(Arc::clone(&fixture.context));
        session.key_exchange(ephemeral, server_box);

        let client = Client {
            ephemeral,
            secret,
            crypto_box: client_box,
        };
        (session, client)
    }

    fn blob_unit(owner: EncrPub, author: EncrPub) -> Vec<u8> {
        let blob = Blob {
            owner,
            author,
            time: Timestamp::from_nanos(1_700_000_000_000_000_000),
            name: "note".to_owned(),
        };
        let mut bytes = Vec::new();
        blob.write_and_sum(&mut bytes, Content::Bytes(b"hello"))
            .unwrap();
        bytes
    }

    fn stored_objects(dir: &std::path::Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .map(|shard| fs::read_dir(shard.unwrap().path()).unwrap().count())
            .sum()
    }

    #[test]
    fn admin_login() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let ack = client.login(&mut session, &fixture.admin, 7);

        assert_eq!(u64::from(ack.requester), 7);
        assert!(ack.is_success());
        assert_eq!(session.state(), State::Established);
        assert_eq!(session.role(), Some(Role::Admin));
        assert_eq!(session.name(), "asnd[Admin]");
        assert_eq!(session.login(), Some(&fixture.admin.login));
        assert_eq!(
            session.server_ephemeral(),
            ack.rekeyed().map(|(public, _)| public).as_ref()
        );
        assert_eq!(
            session.crypto_box().map(CryptoBox::generation),
            Some(Generation::REKEY)
        );
    }

    #[test]
    fn wrong_signature_leaves_the_session_unestablished() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        let impostor = AuthSec::generate(&mut OsRng);
        let request = LoginRequest::new(Requester::from(7u64), fixture.admin.login, &impostor);

        let error = client.send(&mut session, request.to_pdu()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AuthenticationFailure);
        assert_eq!(session.state(), State::Unestablished);
        assert_eq!(session.role(), None);
        assert_eq!(session.login(), None);

        let ack = client.ack(&mut session);
        assert_eq!(u64::from(ack.requester), 7);
        assert!(!ack.is_success());

        let ack = client.login(&mut session, &fixture.admin, 8);
        assert!(ack.is_success());
        assert_eq!(session.state(), State::Established);
    }

    #[test]
    fn user_login_through_the_directory() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        client.login(&mut session, &fixture.user, 1);

        assert_eq!(session.role(), Some(Role::User));
        assert_eq!(
            session.name(),
            format!("asnd[{}]", &fixture.user.login.to_string()[..8])
        );
    }

    #[test]
    fn unknown_user_cannot_login() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        let stranger = Peer::new();

        let error = client
            .send(&mut session, stranger.login_request(1))
            .unwrap_err();

        assert!(matches!(error, SessionError::AuthenticationFailed { login } if login == stranger.login));
        assert_eq!(session.state(), State::Unestablished);
    }

    #[test]
    fn pause_resume_quit() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.admin, 1);
        let established = session.crypto_box().cloned().unwrap();
        let first_ephemeral = *session.server_ephemeral().unwrap();

        let dispatched = client
            .send(&mut session, request(Id::PauseReq, Requester::from(2u64)))
            .unwrap();
        assert_eq!(dispatched, Dispatched::Pause);
        assert_eq!(session.state(), State::Suspended);
        assert!(client.ack(&mut session).rekeyed().is_none());

        let dispatched = client
            .send(&mut session, request(Id::ResumeReq, Requester::from(3u64)))
            .unwrap();
        assert_eq!(dispatched, Dispatched::Resume);
        assert_eq!(session.state(), State::Established);
        let ack = client.ack(&mut session);
        client.rekeyed(&ack);

        assert_ne!(session.crypto_box(), Some(&established));
        assert_ne!(session.server_ephemeral(), Some(&first_ephemeral));
        assert_eq!(session.ephemeral(), Some(&client.ephemeral));

        let dispatched = client
            .send(&mut session, request(Id::QuitReq, Requester::from(4u64)))
            .unwrap();
        assert_eq!(dispatched, Dispatched::Quit);
        assert_eq!(session.state(), State::Quitting);
        assert_eq!(u64::from(client.ack(&mut session).requester), 4);

        let error = client
            .send(&mut session, fixture.admin.login_request(5))
            .unwrap_err();
        assert!(matches!(error, SessionError::Quitting));
        assert_eq!(session.state(), State::Quitting);
    }

    #[test]
    fn resume_moves_to_a_new_box() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);

        client
            .send(&mut session, request(Id::PauseReq, Requester::from(2u64)))
            .unwrap();
        client.ack(&mut session);
        client
            .send(&mut session, request(Id::ResumeReq, Requester::from(3u64)))
            .unwrap();
        client.ack(&mut session);

        // still sealing with the box of the login
        let error = client
            .send(&mut session, request(Id::PauseReq, Requester::from(4u64)))
            .unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn requests_out_of_state() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let error = client
            .send(&mut session, request(Id::PauseReq, Requester::from(1u64)))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        let error = client
            .send(&mut session, request(Id::ResumeReq, Requester::from(2u64)))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        let unit = blob_unit(fixture.user.login, fixture.user.login);
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        assert_eq!(session.state(), State::Unestablished);
        assert!(session.next_outbound().is_none());
    }

    #[test]
    fn login_needs_a_key_exchange() {
        let fixture = fixture();
        let mut session = Session::new(Arc::clone(&fixture.context));

        let error = session
            .dispatch(fixture.admin.login_request(1))
            .unwrap_err();

        assert!(matches!(error, SessionError::MissingKeyExchange));
        assert!(matches!(
            session.receive(&[0u8; 32]),
            Err(SessionError::MissingKeyExchange)
        ));
    }

    #[test]
    fn incompatible_and_unknown_units() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let unit = vec![Version::LATEST.to_u8() + 1, 3, 0, 0];
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::VersionIncompatible);

        let unit = vec![Version::LATEST.to_u8(), 0x0F, 0, 0];
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();
        assert!(matches!(error, SessionError::UnknownId(0x0F)));

        let unit = Header::bytes(Id::Index).to_vec();
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();
        assert!(matches!(error, SessionError::Unsupported(Id::Index)));

        let error = client
            .send(&mut session, Pdu::from(vec![Version::LATEST.to_u8()]))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedFrame);
    }

    #[test]
    fn login_then_blob_then_duplicate() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        let login = fixture.user.login;

        let ack = client.login(&mut session, &fixture.user, 7);
        assert_eq!(u64::from(ack.requester), 7);
        assert_eq!(session.state(), State::Established);

        let unit = blob_unit(login, login);
        let expected = fixture.context.repos.path_for(&Sum::of_bytes(&unit));

        let dispatched = client
            .send(&mut session, Pdu::from(unit.clone()))
            .unwrap();
        assert_eq!(dispatched, Dispatched::Blob(Ingested::Stored(expected.clone())));
        assert_eq!(fs::read(&expected).unwrap(), unit);

        let dispatched = client.send(&mut session, Pdu::from(unit)).unwrap();
        assert_eq!(dispatched, Dispatched::Blob(Ingested::Duplicate(expected)));
        assert_eq!(stored_objects(fixture.context.repos.root()), 1);
        assert!(session.next_outbound().is_none());
    }

    #[test]
    fn blob_of_someone_else_is_denied() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);

        let unit = blob_unit(fixture.admin.login, fixture.admin.login);
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::PermissionDenied);
        assert_eq!(stored_objects(fixture.context.repos.root()), 0);
        assert_eq!(session.state(), State::Established);
    }

    #[test]
    fn admin_may_store_any_blob() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.admin, 1);

        let unit = blob_unit(fixture.user.login, fixture.user.login);
        let dispatched = client.send(&mut session, Pdu::from(unit)).unwrap();

        assert!(matches!(dispatched, Dispatched::Blob(Ingested::Stored(_))));
    }

    #[test]
    fn malformed_blob() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);

        let mut unit = Header::bytes(Id::Blob).to_vec();
        unit.extend_from_slice(b"notmagic and more");
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();

        assert!(matches!(
            error,
            SessionError::Blob(asn_lib::BlobError::NotMagic { consumed: 8 })
        ));
        assert_eq!(error.kind(), ErrorKind::MalformedFrame);
    }

    #[test]
    fn server_login() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let ack = client.login(&mut session, &fixture.server, 1);

        assert!(ack.is_success());
        assert_eq!(session.role(), Some(Role::Server));
        assert_eq!(session.name(), "asnd[Server]");
        assert_eq!(session.login(), Some(&fixture.server.login));
    }

    #[test]
    fn server_key_signed_by_the_admin_is_refused() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        let request = LoginRequest::new(
            Requester::from(1u64),
            fixture.server.login,
            &fixture.admin.auth,
        );

        let error = client.send(&mut session, request.to_pdu()).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AuthenticationFailure);
        assert_eq!(session.role(), None);
    }

    #[test]
    fn login_again_while_established() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);
        let first = session.crypto_box().cloned().unwrap();

        let ack = client.login(&mut session, &fixture.admin, 2);

        assert!(ack.is_success());
        assert_eq!(session.state(), State::Established);
        assert_eq!(session.role(), Some(Role::Admin));
        assert_eq!(session.name(), "asnd[Admin]");
        assert_ne!(session.crypto_box(), Some(&first));

        client
            .send(&mut session, request(Id::PauseReq, Requester::from(3u64)))
            .unwrap();
        assert_eq!(session.state(), State::Suspended);
    }

    #[test]
    fn quit_before_login() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let dispatched = client
            .send(&mut session, request(Id::QuitReq, Requester::from(1u64)))
            .unwrap();

        assert_eq!(dispatched, Dispatched::Quit);
        assert_eq!(session.state(), State::Quitting);
        assert!(client.ack(&mut session).is_success());
    }

    #[test]
    fn quit_while_suspended() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);
        client
            .send(&mut session, request(Id::PauseReq, Requester::from(2u64)))
            .unwrap();
        client.ack(&mut session);

        let dispatched = client
            .send(&mut session, request(Id::QuitReq, Requester::from(3u64)))
            .unwrap();

        assert_eq!(dispatched, Dispatched::Quit);
        assert_eq!(session.state(), State::Quitting);

        let error = client
            .send(&mut session, request(Id::ResumeReq, Requester::from(4u64)))
            .unwrap_err();
        assert!(matches!(error, SessionError::Quitting));
    }

    #[test]
    fn flagged_units_are_unknown() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);

        let mut unit = fixture.admin.login_request(1).as_bytes().to_vec();
        unit[1] = flag_deleted(unit[1]);
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnknownIdentifier);
        assert!(matches!(error, SessionError::UnknownId(raw) if is_deleted(raw)));
        assert_eq!(session.state(), State::Unestablished);
        assert!(session.next_outbound().is_none());

        client.login(&mut session, &fixture.user, 2);
        let mut unit = blob_unit(fixture.user.login, fixture.user.login);
        unit[1] = flag_deleted(unit[1]);
        let error = client.send(&mut session, Pdu::from(unit)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(stored_objects(fixture.context.repos.root()), 0);
    }

    #[test]
    fn flushed_pools() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.user, 1);
        let unit = blob_unit(fixture.user.login, fixture.user.login);
        client.send(&mut session, Pdu::from(unit)).unwrap();
        drop(session);
        assert_eq!(fixture.context.pooled_sessions(), 1);
        assert_eq!(fixture.context.blobs.len(), 1);

        fixture.context.flush_pools();

        assert_eq!(fixture.context.pooled_sessions(), 0);
        assert!(fixture.context.blobs.is_empty());
    }

    #[test]
    fn released_sessions_are_reset() {
        let fixture = fixture();
        let (mut session, mut client) = connect(&fixture);
        client.login(&mut session, &fixture.admin, 1);
        session.set_location(1, 2, 3);
        drop(session);

        assert_eq!(fixture.context.pooled_sessions(), 1);

        let session = Session::new(Arc::clone(&fixture.context));
        assert_eq!(fixture.context.pooled_sessions(), 0);
        assert_eq!(session.name(), "asnd");
        assert_eq!(session.state(), State::Unestablished);
        assert_eq!(session.role(), None);
        assert_eq!(session.login(), None);
        assert_eq!(session.ephemeral(), None);
        assert!(session.crypto_box().is_none());
        assert_eq!(session.location(), (0, 0, 0));
    }
}
