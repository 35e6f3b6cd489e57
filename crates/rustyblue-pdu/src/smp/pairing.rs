//! Pairing state and pairing method selection
//!
//! The method tables follow Core Specification Vol 3 Part H, 2.3.5.1:
//! rows are indexed by the responder's IO capability, columns by the
//! initiator's. [`PairingSession`] tracks one pairing sequence of a
//! connection on top of these pure functions.

use super::constants::*;
use super::keys::DeviceKeys;
use super::pdu::{SmpPairingMsg, SmpPdu};
use super::types::*;
use log::{debug, warn};
use std::fmt;
use std::time::{Duration, Instant};

/// Progress of a pairing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpPairingState {
    /// No pairing in progress
    None,
    /// Pairing failed; absorbing
    Failed,
    /// The responder sent a security request
    RequestedByResponder,
    /// Pairing request sent or received
    FeatureExchangeStarted,
    /// Pairing response sent or received
    FeatureExchangeCompleted,
    /// Waiting for the user to enter or confirm a passkey
    PasskeyExpected,
    /// Waiting for the user to confirm a numeric comparison
    NumericCompareExpected,
    /// Waiting for out of band data
    OobExpected,
    /// Keys are being distributed
    KeyDistribution,
    /// Pairing done; absorbing
    Completed,
}

impl SmpPairingState {
    /// True unless the sequence is idle or finished
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            SmpPairingState::None | SmpPairingState::Failed | SmpPairingState::Completed
        )
    }

    pub fn has_finished(self) -> bool {
        matches!(self, SmpPairingState::Failed | SmpPairingState::Completed)
    }

    /// True while waiting for the local user
    pub fn is_user_interaction(self) -> bool {
        matches!(
            self,
            SmpPairingState::PasskeyExpected
                | SmpPairingState::NumericCompareExpected
                | SmpPairingState::OobExpected
        )
    }

    /// Whether user input for `expected` may be accepted in this state.
    pub fn is_allowing_input(self, expected: SmpPairingState) -> bool {
        matches!(
            self,
            SmpPairingState::FeatureExchangeStarted | SmpPairingState::FeatureExchangeCompleted
        ) || self == expected
    }
}

impl fmt::Display for SmpPairingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Association model of a pairing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairingMode {
    /// Not paired
    None,
    /// Feature exchange in progress, method not yet known
    Negotiating,
    /// Unauthenticated, no MITM protection
    JustWorks,
    /// Passkey entry, the initiator inputs and the responder displays
    PasskeyEntryInitiator,
    /// Passkey entry, the responder inputs and the initiator displays
    PasskeyEntryResponder,
    /// Numeric comparison confirmed on the initiator
    NumericCompareInitiator,
    /// Numeric comparison confirmed on the responder
    NumericCompareResponder,
    /// Out of band data exchange
    OutOfBand,
    /// Keys from an earlier pairing are reused
    PrePaired,
}

impl PairingMode {
    /// True for the modes that provide MITM protection
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            PairingMode::PasskeyEntryInitiator
                | PairingMode::PasskeyEntryResponder
                | PairingMode::NumericCompareInitiator
                | PairingMode::NumericCompareResponder
                | PairingMode::OutOfBand
        )
    }

    /// The state that waits for this mode's user interaction, if any
    pub fn expected_input_state(self) -> Option<SmpPairingState> {
        match self {
            PairingMode::PasskeyEntryInitiator | PairingMode::PasskeyEntryResponder => {
                Some(SmpPairingState::PasskeyExpected)
            }
            PairingMode::NumericCompareInitiator | PairingMode::NumericCompareResponder => {
                Some(SmpPairingState::NumericCompareExpected)
            }
            PairingMode::OutOfBand => Some(SmpPairingState::OobExpected),
            _ => None,
        }
    }

    /// Security level of a link encrypted with keys from this mode
    pub fn security_level(self, secure_connections: bool) -> SecurityLevel {
        match self {
            PairingMode::None | PairingMode::Negotiating => SecurityLevel::None,
            PairingMode::JustWorks | PairingMode::PrePaired => SecurityLevel::EncryptionOnly,
            _ if secure_connections => SecurityLevel::SecureConnections,
            _ => SecurityLevel::EncryptionWithAuthentication,
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

use PairingMode::{
    JustWorks as JW, NumericCompareInitiator as NC, PasskeyEntryInitiator as PI,
    PasskeyEntryResponder as PR,
};

/// LE legacy pairing, `[responder][initiator]`
const LEGACY_MODES: [[PairingMode; 5]; 5] = [
    [JW, JW, PI, JW, PI], // DisplayOnly
    [JW, JW, PI, JW, PI], // DisplayYesNo
    [PR, PR, PI, JW, PR], // KeyboardOnly
    [JW, JW, JW, JW, JW], // NoInputNoOutput
    [PR, PR, PI, JW, PR], // KeyboardDisplay
];

/// LE Secure Connections, `[responder][initiator]`
const SECURE_CONNECTIONS_MODES: [[PairingMode; 5]; 5] = [
    [JW, JW, PI, JW, PI], // DisplayOnly
    [JW, NC, PI, JW, NC], // DisplayYesNo
    [PR, PR, PI, JW, PR], // KeyboardOnly
    [JW, JW, JW, JW, JW], // NoInputNoOutput
    [PR, NC, PI, JW, NC], // KeyboardDisplay
];

fn table_index(io: SmpIoCapability) -> SmpResult<usize> {
    io.table_index()
        .ok_or_else(|| SmpError::InvalidState("IO capability not yet exchanged".into()))
}

/// Pairing method from the IO capabilities alone, for callers that have
/// already established that MITM protection is requested and OOB is not
/// in use.
pub fn pairing_mode_for_io(
    use_secure_connections: bool,
    initiator_io: SmpIoCapability,
    responder_io: SmpIoCapability,
) -> SmpResult<PairingMode> {
    let table = if use_secure_connections {
        &SECURE_CONNECTIONS_MODES
    } else {
        &LEGACY_MODES
    };
    Ok(table[table_index(responder_io)?][table_index(initiator_io)?])
}

/// Pairing method from both sides' PAIRING_REQUEST/RESPONSE parameters.
///
/// OOB wins when both sides (legacy) or either side (Secure Connections)
/// have OOB data. Without MITM requested by either side the method is
/// Just Works. Otherwise the IO capability tables decide.
pub fn get_pairing_mode(
    use_secure_connections: bool,
    initiator: &SmpPairingFeatures,
    responder: &SmpPairingFeatures,
) -> SmpResult<PairingMode> {
    // Unset capabilities are an error even where the tables are not consulted
    table_index(initiator.io_capability)?;
    table_index(responder.io_capability)?;

    let oob = if use_secure_connections {
        initiator.has_oob_data() || responder.has_oob_data()
    } else {
        initiator.has_oob_data() && responder.has_oob_data()
    };
    if oob {
        return Ok(PairingMode::OutOfBand);
    }
    if !initiator.wants_mitm() && !responder.wants_mitm() {
        return Ok(PairingMode::JustWorks);
    }
    pairing_mode_for_io(
        use_secure_connections,
        initiator.io_capability,
        responder.io_capability,
    )
}

/// One pairing sequence on one connection.
///
/// FAILED and COMPLETED are absorbing; a new sequence needs a new session.
#[derive(Debug, Clone)]
pub struct PairingSession {
    role: PairingRole,
    state: SmpPairingState,
    local_features: SmpPairingFeatures,
    remote_features: Option<SmpPairingFeatures>,
    mode: PairingMode,
    secure_connections: bool,
    key_size: Option<u8>,
    failure_reason: Option<SmpReasonCode>,
    remote_keys: DeviceKeys,
    timeout: Duration,
    passkey_timeout: Duration,
    timestamp: Instant,
}

impl PairingSession {
    /// Create a new pairing session as initiator
    pub fn new_initiator(features: SmpPairingFeatures) -> Self {
        Self::new(PairingRole::Initiator, features)
    }

    /// Create a new pairing session as responder
    pub fn new_responder(features: SmpPairingFeatures) -> Self {
        Self::new(PairingRole::Responder, features)
    }

    fn new(role: PairingRole, local_features: SmpPairingFeatures) -> Self {
        Self {
            role,
            state: SmpPairingState::None,
            local_features,
            remote_features: None,
            mode: PairingMode::None,
            secure_connections: false,
            key_size: None,
            failure_reason: None,
            remote_keys: DeviceKeys::new(),
            timeout: Duration::from_millis(SMP_TIMEOUT_GENERAL),
            passkey_timeout: Duration::from_millis(SMP_TIMEOUT_PASSKEY),
            timestamp: Instant::now(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout applied while waiting for passkey entry
    pub fn with_passkey_timeout(mut self, timeout: Duration) -> Self {
        self.passkey_timeout = timeout;
        self
    }

    pub fn role(&self) -> PairingRole {
        self.role
    }

    pub fn state(&self) -> SmpPairingState {
        self.state
    }

    pub fn mode(&self) -> PairingMode {
        self.mode
    }

    pub fn local_features(&self) -> &SmpPairingFeatures {
        &self.local_features
    }

    pub fn remote_features(&self) -> Option<&SmpPairingFeatures> {
        self.remote_features.as_ref()
    }

    pub fn is_secure_connections(&self) -> bool {
        self.secure_connections
    }

    /// Reason of the failure, when it is known
    pub fn failure_reason(&self) -> Option<SmpReasonCode> {
        self.failure_reason
    }

    /// Keys received from the peer so far
    pub fn remote_keys(&self) -> &DeviceKeys {
        &self.remote_keys
    }

    pub fn security_level(&self) -> SecurityLevel {
        if self.state == SmpPairingState::Completed {
            self.mode.security_level(self.secure_connections)
        } else {
            SecurityLevel::None
        }
    }

    /// Moves to `next`, refusing to leave a finished sequence.
    pub fn set_state(&mut self, next: SmpPairingState) -> SmpResult<()> {
        if self.state.has_finished() {
            warn!("SMP pairing already {}, ignoring {}", self.state, next);
            return Err(SmpError::InvalidState(format!(
                "pairing already {}",
                self.state
            )));
        }
        debug!("SMP pairing state {} -> {}", self.state, next);
        self.state = next;
        self.update_timestamp();
        Ok(())
    }

    /// Ends the sequence with `reason`. Has no effect once finished.
    pub fn fail(&mut self, reason: SmpReasonCode) {
        if self.state.has_finished() {
            return;
        }
        debug!("SMP pairing failed in {}: {}", self.state, reason);
        self.failure_reason = Some(reason);
        self.state = SmpPairingState::Failed;
    }

    /// Builds the PAIRING_REQUEST from the local features.
    pub fn start_pairing(&mut self) -> SmpResult<SmpPairingMsg<'static>> {
        if self.role != PairingRole::Initiator {
            return Err(SmpError::InvalidState(
                "only the initiator sends a pairing request".into(),
            ));
        }
        let req = SmpPairingMsg::new_request(&self.local_features)?;
        self.set_state(SmpPairingState::FeatureExchangeStarted)?;
        self.mode = PairingMode::Negotiating;
        Ok(req)
    }

    /// Feeds one inbound PDU into the sequence.
    ///
    /// A PAIRING_REQUEST received by a responder returns the PAIRING_RESPONSE
    /// to send back.
    pub fn on_pdu(&mut self, pdu: &SmpPdu<'_>) -> SmpResult<Option<SmpPairingMsg<'static>>> {
        if let SmpPdu::PairFailed(failed) = pdu {
            self.fail(failed.reason_code());
            return Ok(None);
        }
        if self.state.has_finished() {
            warn!("SMP pairing already {}, dropping {}", self.state, pdu);
            return Err(SmpError::InvalidState(format!(
                "pairing already {}",
                self.state
            )));
        }
        self.update_timestamp();
        match pdu {
            SmpPdu::SecurityReq(_) if self.role == PairingRole::Initiator => {
                if self.state == SmpPairingState::None {
                    self.set_state(SmpPairingState::RequestedByResponder)?;
                }
                Ok(None)
            }
            SmpPdu::Pairing(msg) if msg.is_request() && self.role == PairingRole::Responder => {
                if !matches!(
                    self.state,
                    SmpPairingState::None | SmpPairingState::RequestedByResponder
                ) {
                    return self.unexpected(pdu);
                }
                self.set_state(SmpPairingState::FeatureExchangeStarted)?;
                self.mode = PairingMode::Negotiating;
                let remote = msg.features();
                let mut local = self.local_features;
                // Never offer keys the initiator did not ask for
                local.initiator_key_dist &= remote.initiator_key_dist;
                local.responder_key_dist &= remote.responder_key_dist;
                let rsp = SmpPairingMsg::new_response(&local)?;
                self.negotiate(remote)?;
                Ok(Some(rsp))
            }
            SmpPdu::Pairing(msg) if !msg.is_request() && self.role == PairingRole::Initiator => {
                if self.state != SmpPairingState::FeatureExchangeStarted {
                    return self.unexpected(pdu);
                }
                self.negotiate(msg.features())?;
                Ok(None)
            }
            SmpPdu::EncInfo(_)
            | SmpPdu::MasterIdent(_)
            | SmpPdu::IdentInfo(_)
            | SmpPdu::IdentAddrInfo(_)
            | SmpPdu::SignInfo(_) => {
                // entered by the caller once the link is encrypted
                if self.state != SmpPairingState::KeyDistribution {
                    return self.unexpected(pdu);
                }
                self.remote_keys
                    .absorb(pdu, self.mode.is_authenticated(), self.secure_connections)?;
                Ok(None)
            }
            SmpPdu::Undefined(_) => {
                debug!("Ignoring undefined SMP opcode {}", pdu.opcode());
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn unexpected(&mut self, pdu: &SmpPdu<'_>) -> SmpResult<Option<SmpPairingMsg<'static>>> {
        warn!("Unexpected {} in SMP state {}", pdu.name(), self.state);
        Err(SmpError::InvalidState(format!(
            "{} in state {}",
            pdu.name(),
            self.state
        )))
    }

    /// Applies the peer's features: key size, key distribution and method.
    fn negotiate(&mut self, remote: SmpPairingFeatures) -> SmpResult<()> {
        let key_size = self.local_features.max_key_size.min(remote.max_key_size);
        if key_size < SMP_MIN_ENCRYPTION_KEY_SIZE {
            self.fail(SmpReasonCode::EncryptionKeySize);
            return Err(SmpError::PairingFailed(SmpReasonCode::EncryptionKeySize));
        }
        self.secure_connections =
            self.local_features.supports_secure_connections() && remote.supports_secure_connections();

        let (initiator, responder) = match self.role {
            PairingRole::Initiator => (&self.local_features, &remote),
            PairingRole::Responder => (&remote, &self.local_features),
        };
        let mode = match get_pairing_mode(self.secure_connections, initiator, responder) {
            Ok(mode) => mode,
            Err(e) => {
                self.fail(SmpReasonCode::InvalidParameters);
                return Err(e);
            }
        };
        debug!(
            "SMP negotiated {} (secure connections {}, key size {})",
            mode, self.secure_connections, key_size
        );
        self.mode = mode;
        self.key_size = Some(key_size);
        self.remote_features = Some(remote);
        self.set_state(SmpPairingState::FeatureExchangeCompleted)?;
        if let Some(input) = mode.expected_input_state() {
            self.set_state(input)?;
        }
        Ok(())
    }

    /// Encryption key size agreed on, after the feature exchange
    pub fn negotiated_key_size(&self) -> Option<u8> {
        self.key_size
    }

    /// Initiator and responder key distribution agreed on by both sides
    pub fn negotiated_key_dist(&self) -> Option<(SmpKeyDist, SmpKeyDist)> {
        let remote = self.remote_features.as_ref()?;
        Some((
            self.local_features.initiator_key_dist & remote.initiator_key_dist,
            self.local_features.responder_key_dist & remote.responder_key_dist,
        ))
    }

    /// Keys the peer is expected to send
    pub fn expected_remote_keys(&self) -> Option<SmpKeyDist> {
        let (initiator, responder) = self.negotiated_key_dist()?;
        Some(match self.role {
            PairingRole::Initiator => responder,
            PairingRole::Responder => initiator,
        })
    }

    /// True once every key the peer is expected to send has arrived
    pub fn remote_keys_complete(&self) -> bool {
        self.expected_remote_keys()
            .is_some_and(|dist| self.remote_keys.is_complete(dist, self.secure_connections))
    }

    /// Timeout of the current state
    pub fn current_timeout(&self) -> Duration {
        if self.state == SmpPairingState::PasskeyExpected {
            self.passkey_timeout
        } else {
            self.timeout
        }
    }

    /// Check if pairing has timed out
    pub fn has_timed_out(&self) -> bool {
        self.state.is_active() && self.timestamp.elapsed() > self.current_timeout()
    }

    /// Restarts the idle timer, e.g. on local keypresses
    pub fn update_timestamp(&mut self) {
        self.timestamp = Instant::now();
    }

    /// Fails the sequence if it has been idle past its timeout.
    pub fn check_timeout(&mut self) -> SmpResult<()> {
        if self.has_timed_out() {
            warn!("SMP pairing timed out in {}", self.state);
            self.fail(SmpReasonCode::UnspecifiedReason);
            return Err(SmpError::Timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smp::pdu::{parse_smp_pdu, SmpPairFailedMsg, SmpPduMessage, SmpSecurityReqMsg};

    fn features(io: SmpIoCapability, auth: SmpAuthReqs) -> SmpPairingFeatures {
        SmpPairingFeatures {
            io_capability: io,
            auth_reqs: auth,
            ..Default::default()
        }
    }

    #[test]
    fn test_state_predicates() {
        use SmpPairingState::*;
        let all = [
            None,
            Failed,
            RequestedByResponder,
            FeatureExchangeStarted,
            FeatureExchangeCompleted,
            PasskeyExpected,
            NumericCompareExpected,
            OobExpected,
            KeyDistribution,
            Completed,
        ];
        for state in all {
            assert_eq!(state.is_active(), !matches!(state, None | Failed | Completed));
            assert_eq!(state.has_finished(), matches!(state, Failed | Completed));
            assert_eq!(
                state.is_user_interaction(),
                matches!(state, PasskeyExpected | NumericCompareExpected | OobExpected)
            );
        }
        assert!(FeatureExchangeStarted.is_allowing_input(PasskeyExpected));
        assert!(PasskeyExpected.is_allowing_input(PasskeyExpected));
        assert!(!NumericCompareExpected.is_allowing_input(PasskeyExpected));
        assert!(!KeyDistribution.is_allowing_input(PasskeyExpected));
    }

    #[test]
    fn test_table_entries() {
        use SmpIoCapability::*;
        assert_eq!(pairing_mode_for_io(true, DisplayYesNo, DisplayYesNo).unwrap(), NC);
        assert_eq!(pairing_mode_for_io(false, DisplayYesNo, DisplayYesNo).unwrap(), JW);
        assert_eq!(pairing_mode_for_io(false, KeyboardOnly, DisplayOnly).unwrap(), PI);
        assert_eq!(pairing_mode_for_io(false, DisplayOnly, KeyboardOnly).unwrap(), PR);
        assert_eq!(pairing_mode_for_io(true, KeyboardDisplay, KeyboardDisplay).unwrap(), NC);
        assert_eq!(pairing_mode_for_io(false, KeyboardDisplay, KeyboardDisplay).unwrap(), PR);
        assert_eq!(pairing_mode_for_io(true, NoInputNoOutput, KeyboardDisplay).unwrap(), JW);
        assert!(matches!(
            pairing_mode_for_io(true, Unset, DisplayOnly),
            Err(SmpError::InvalidState(_))
        ));
    }

    #[test]
    fn test_mitm_and_oob_precedence() {
        let kb = features(SmpIoCapability::KeyboardOnly, SmpAuthReqs::BONDING);
        let disp = features(SmpIoCapability::DisplayOnly, SmpAuthReqs::BONDING);
        assert_eq!(get_pairing_mode(false, &kb, &disp).unwrap(), PairingMode::JustWorks);

        let kb_mitm = features(SmpIoCapability::KeyboardOnly, SmpAuthReqs::MITM);
        assert_eq!(
            get_pairing_mode(false, &kb_mitm, &disp).unwrap(),
            PairingMode::PasskeyEntryInitiator
        );

        let mut disp_oob = disp;
        disp_oob.oob_data_flag = SmpOobDataFlag::Present;
        // legacy needs OOB data on both sides
        assert_eq!(
            get_pairing_mode(false, &kb_mitm, &disp_oob).unwrap(),
            PairingMode::PasskeyEntryInitiator
        );
        assert_eq!(get_pairing_mode(true, &kb, &disp_oob).unwrap(), PairingMode::OutOfBand);
        let mut kb_oob = kb;
        kb_oob.oob_data_flag = SmpOobDataFlag::Present;
        assert_eq!(get_pairing_mode(false, &kb_oob, &disp_oob).unwrap(), PairingMode::OutOfBand);
    }

    #[test]
    fn test_security_level_from_mode() {
        assert_eq!(PairingMode::JustWorks.security_level(true), SecurityLevel::EncryptionOnly);
        assert_eq!(
            PairingMode::PasskeyEntryResponder.security_level(false),
            SecurityLevel::EncryptionWithAuthentication
        );
        assert_eq!(
            PairingMode::NumericCompareInitiator.security_level(true),
            SecurityLevel::SecureConnections
        );
        assert_eq!(PairingMode::Negotiating.security_level(true), SecurityLevel::None);
    }

    #[test]
    fn test_feature_exchange_between_sessions() {
        let auth = SmpAuthReqs::BONDING | SmpAuthReqs::MITM | SmpAuthReqs::SECURE_CONNECTIONS;
        let mut central = PairingSession::new_initiator(features(SmpIoCapability::KeyboardDisplay, auth));
        let mut peripheral = PairingSession::new_responder(SmpPairingFeatures {
            max_key_size: 12,
            responder_key_dist: SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY,
            ..features(SmpIoCapability::DisplayYesNo, auth)
        });

        let req = central.start_pairing().unwrap();
        assert_eq!(central.state(), SmpPairingState::FeatureExchangeStarted);

        let rsp = peripheral
            .on_pdu(&parse_smp_pdu(req.as_bytes()).unwrap())
            .unwrap()
            .expect("responder answers a pairing request");
        assert!(central.on_pdu(&parse_smp_pdu(rsp.as_bytes()).unwrap()).unwrap().is_none());

        for session in [&central, &peripheral] {
            assert!(session.is_secure_connections());
            assert_eq!(session.mode(), PairingMode::NumericCompareInitiator);
            assert_eq!(session.state(), SmpPairingState::NumericCompareExpected);
            assert_eq!(session.negotiated_key_size(), Some(12));
        }
        let (_, responder_dist) = central.negotiated_key_dist().unwrap();
        assert_eq!(responder_dist, SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY);
    }

    #[test]
    fn test_key_size_below_minimum_fails() {
        let mut central = PairingSession::new_initiator(SmpPairingFeatures::default());
        central.start_pairing().unwrap();
        let rsp = [0x02, 0x03, 0x00, 0x01, 0x06, 0x00, 0x00];
        let result = central.on_pdu(&parse_smp_pdu(&rsp).unwrap());
        assert_eq!(
            result.unwrap_err(),
            SmpError::PairingFailed(SmpReasonCode::EncryptionKeySize)
        );
        assert_eq!(central.state(), SmpPairingState::Failed);
        assert_eq!(central.failure_reason(), Some(SmpReasonCode::EncryptionKeySize));
    }

    #[test]
    fn test_terminal_states_absorb() {
        let mut session = PairingSession::new_initiator(SmpPairingFeatures::default());
        let sec = SmpSecurityReqMsg::new(SmpAuthReqs::BONDING).unwrap();
        session.on_pdu(&parse_smp_pdu(sec.as_bytes()).unwrap()).unwrap();
        assert_eq!(session.state(), SmpPairingState::RequestedByResponder);

        let failed = SmpPairFailedMsg::new(SmpReasonCode::PairingNotSupported).unwrap();
        session.on_pdu(&parse_smp_pdu(failed.as_bytes()).unwrap()).unwrap();
        assert_eq!(session.state(), SmpPairingState::Failed);

        assert!(session.set_state(SmpPairingState::FeatureExchangeStarted).is_err());
        assert!(session.start_pairing().is_err());
        session.fail(SmpReasonCode::RepeatedAttempts);
        assert_eq!(session.failure_reason(), Some(SmpReasonCode::PairingNotSupported));
        assert_eq!(session.state(), SmpPairingState::Failed);
    }

    #[test]
    fn test_timeout() {
        let mut session = PairingSession::new_initiator(SmpPairingFeatures::default())
            .with_timeout(Duration::ZERO);
        assert!(session.check_timeout().is_ok());
        session.start_pairing().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(session.check_timeout(), Err(SmpError::Timeout));
        assert_eq!(session.state(), SmpPairingState::Failed);
    }

    #[test]
    fn test_passkey_entry_has_its_own_timeout() {
        let mut session =
            PairingSession::new_initiator(features(SmpIoCapability::KeyboardOnly, SmpAuthReqs::MITM))
                .with_timeout(Duration::ZERO);
        session.start_pairing().unwrap();
        let rsp = SmpPairingMsg::new_response(&features(
            SmpIoCapability::DisplayOnly,
            SmpAuthReqs::BONDING,
        ))
        .unwrap();
        session.on_pdu(&SmpPdu::Pairing(rsp)).unwrap();
        assert_eq!(session.state(), SmpPairingState::PasskeyExpected);
        assert_eq!(
            session.current_timeout(),
            Duration::from_millis(SMP_TIMEOUT_PASSKEY)
        );

        std::thread::sleep(Duration::from_millis(2));
        assert!(session.check_timeout().is_ok());

        let mut session = session.with_passkey_timeout(Duration::ZERO);
        session.update_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(session.check_timeout(), Err(SmpError::Timeout));
    }
}
