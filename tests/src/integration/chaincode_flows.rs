//! # Chaincode Session Flows
//!
//! Full sessions between a peer-side handler running its receive loop and a
//! scripted chaincode instance on the other end of an in-memory stream
//! pair: register, initialize with state writes, execute a transaction with
//! a state read, and the failure paths a peer must survive.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    use chaincode_support::prelude::*;
    use shared_types::{stream_pair, MessageStream};

    const TICK: Duration = Duration::from_millis(200);

    struct Session {
        handler: Arc<ChaincodeHandler>,
        loop_task: tokio::task::JoinHandle<Result<(), HandlerError>>,
        /// The scripted chaincode's end of the stream.
        chaincode: Arc<dyn MessageStream>,
        ledger: Arc<InMemoryLedger>,
        directory: Arc<InMemoryDirectory>,
        startup: oneshot::Receiver<bool>,
    }

    /// Spin up a handler with its receive loop running, sharing `directory`.
    fn start_session(directory: Arc<InMemoryDirectory>) -> Session {
        let (peer_end, chaincode_end) = stream_pair(32);
        let ledger = Arc::new(InMemoryLedger::new());
        let (startup_tx, startup_rx) = oneshot::channel();
        let handler = ChaincodeHandler::new(
            Arc::new(peer_end),
            ledger.clone(),
            directory.clone(),
            Some(startup_tx),
        );
        let loop_task = tokio::spawn(handler.clone().process_stream());
        Session {
            handler,
            loop_task,
            chaincode: Arc::new(chaincode_end),
            ledger,
            directory,
            startup: startup_rx,
        }
    }

    /// Chaincode-side registration: send REGISTER, consume the ack.
    async fn register(session: &Session, name: &str) {
        let payload = ChaincodeId::new(name, "1.0").encode().unwrap();
        session
            .chaincode
            .send(Envelope::new(MessageType::Register, "", payload))
            .await
            .unwrap();
        let ack = recv(&session.chaincode).await;
        assert_eq!(ack.message_type, MessageType::Registered);
    }

    async fn recv(stream: &Arc<dyn MessageStream>) -> Envelope {
        timeout(TICK, stream.recv())
            .await
            .expect("timed out waiting for envelope")
            .unwrap()
            .expect("stream ended unexpectedly")
    }

    /// Poll until the handler reaches `expected` or the deadline passes.
    async fn wait_for_state(handler: &ChaincodeHandler, expected: State) {
        for _ in 0..200 {
            if handler.current_state() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!(
            "handler stuck in {}, expected {expected}",
            handler.current_state()
        );
    }

    #[tokio::test]
    async fn test_full_session_register_init_transact() {
        crate::init_tracing();
        let mut session = start_session(Arc::new(InMemoryDirectory::new()));

        // --- Registration -------------------------------------------------
        register(&session, "asset-transfer").await;
        assert_eq!((&mut session.startup).await, Ok(true));

        // --- Initialization with a state write ----------------------------
        let init_input = ChaincodeInput::new("init", vec!["alice".into(), "100".into()]);
        let init_waiter = session
            .handler
            .init_or_ready("init-1", Some(init_input.clone()))
            .await
            .unwrap()
            .expect("init with arguments returns a waiter");

        let init = recv(&session.chaincode).await;
        assert_eq!(init.message_type, MessageType::Init);
        assert_eq!(ChaincodeInput::decode(&init.payload).unwrap(), init_input);

        // The chaincode writes its genesis state while initializing.
        let put = PutStatePayload::new("alice", b"100".to_vec()).encode().unwrap();
        session
            .chaincode
            .send(Envelope::new(MessageType::PutState, "init-1", put))
            .await
            .unwrap();
        let put_reply = recv(&session.chaincode).await;
        assert_eq!(put_reply.message_type, MessageType::Response);
        wait_for_state(&session.handler, State::Init).await;

        session
            .chaincode
            .send(Envelope::new(MessageType::Completed, "init-1", vec![]))
            .await
            .unwrap();
        let done = init_waiter.wait().await.unwrap();
        assert_eq!(done.message_type, MessageType::Completed);
        wait_for_state(&session.handler, State::Ready).await;

        // --- Transaction with a state read --------------------------------
        let tx_id = uuid::Uuid::new_v4().to_string();
        let tx_input = ChaincodeInput::new("query", vec!["alice".into()]);
        let tx = Envelope::new(
            MessageType::Transaction,
            tx_id.clone(),
            tx_input.encode().unwrap(),
        );
        let tx_waiter = session.handler.execute_transaction(tx).await.unwrap();

        let forwarded = recv(&session.chaincode).await;
        assert_eq!(forwarded.message_type, MessageType::Transaction);

        session
            .chaincode
            .send(Envelope::new(
                MessageType::GetState,
                tx_id.clone(),
                b"alice".to_vec(),
            ))
            .await
            .unwrap();
        let get_reply = recv(&session.chaincode).await;
        assert_eq!(get_reply.message_type, MessageType::Response);
        assert_eq!(get_reply.payload, b"100");

        // The transfer consumes the account.
        session
            .chaincode
            .send(Envelope::new(
                MessageType::DelState,
                tx_id.clone(),
                b"alice".to_vec(),
            ))
            .await
            .unwrap();
        let del_reply = recv(&session.chaincode).await;
        assert_eq!(del_reply.message_type, MessageType::Response);
        wait_for_state(&session.handler, State::Transaction).await;

        session
            .chaincode
            .send(Envelope::new(MessageType::Completed, tx_id.clone(), b"100".to_vec()))
            .await
            .unwrap();
        let result = tx_waiter.wait().await.unwrap();
        assert_eq!(result.message_type, MessageType::Completed);
        assert_eq!(result.payload, b"100");

        // --- Shutdown -----------------------------------------------------
        drop(session.chaincode);
        session.loop_task.await.unwrap().unwrap();
        assert!(matches!(
            session.ledger.get("asset-transfer:1.0", "alice").await,
            Err(LedgerError::NotFound { .. })
        ));
        // Identity was released on the way out.
        assert!(session
            .directory
            .register(&ChaincodeId::new("asset-transfer", "1.0"))
            .is_ok());
    }

    #[tokio::test]
    async fn test_malformed_register_fails_startup_and_ends_stream() {
        let session = start_session(Arc::new(InMemoryDirectory::new()));

        session
            .chaincode
            .send(Envelope::new(MessageType::Register, "", vec![0xde, 0xad]))
            .await
            .unwrap();

        assert_eq!(session.startup.await, Ok(false));
        let err = session.loop_task.await.unwrap().unwrap_err();
        assert!(matches!(err, HandlerError::Codec(_)));
    }

    #[tokio::test]
    async fn test_second_registration_of_same_identity_is_refused() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut first = start_session(directory.clone());
        register(&first, "kv").await;
        assert_eq!((&mut first.startup).await, Ok(true));

        // A second instance claims the same name and version.
        let second = start_session(directory.clone());
        let payload = ChaincodeId::new("kv", "1.0").encode().unwrap();
        second
            .chaincode
            .send(Envelope::new(MessageType::Register, "", payload))
            .await
            .unwrap();

        assert_eq!(second.startup.await, Ok(false));
        let err = second.loop_task.await.unwrap().unwrap_err();
        assert!(matches!(err, HandlerError::Registration(_)));

        // The first handler's claim survives the rejected usurper.
        assert!(directory.register(&ChaincodeId::new("kv", "1.0")).is_err());
    }

    #[tokio::test]
    async fn test_stream_death_mid_transaction_releases_waiter() {
        let mut session = start_session(Arc::new(InMemoryDirectory::new()));
        register(&session, "kv").await;
        assert_eq!((&mut session.startup).await, Ok(true));
        session.handler.init_or_ready("unused", None).await.unwrap();

        let tx_id = uuid::Uuid::new_v4().to_string();
        let tx = Envelope::new(MessageType::Transaction, tx_id, vec![]);
        let waiter = session.handler.execute_transaction(tx).await.unwrap();
        let _forwarded = recv(&session.chaincode).await;

        // Chaincode crashes before replying.
        drop(session.chaincode);
        session.loop_task.await.unwrap().unwrap();

        let released = waiter.wait().await.unwrap();
        assert_eq!(released.message_type, MessageType::Error);
        assert!(released.description().contains("stream ended"));
    }

    #[tokio::test]
    async fn test_protocol_violation_ends_stream_without_reply() {
        let session = start_session(Arc::new(InMemoryDirectory::new()));

        // GET_STATE before REGISTER is undefined in the lifecycle table.
        session
            .chaincode
            .send(Envelope::new(MessageType::GetState, "g1", b"k".to_vec()))
            .await
            .unwrap();

        let err = session.loop_task.await.unwrap().unwrap_err();
        assert!(matches!(err, HandlerError::Protocol(_)));

        // The violation produced no reply before the stream closed.
        drop(session.handler);
        let leftover = session.chaincode.recv().await.unwrap();
        assert!(leftover.is_none());
    }
}
