use super::{
    AddKeychainRequest, AddedKeychain, ClientError, CoordinatorClient,
    CoordinatorKeygenFinalizeReply, CoordinatorKeygenRound1Reply, CoordinatorKeygenRound2Reply,
    EddsaCommitmentReply, EddsaCommitmentRequest, EddsaGShareReply, EddsaGShareRequest,
    EddsaRShareReply, EddsaRShareRequest, InitializedParty, KeygenFinalizeReply,
    KeygenFinalizeRequest, KeygenRound1Reply, KeygenRound1Request, KeygenRound2Reply,
    KeygenRound2Request, KeygenRound3Reply, KeygenRound3Request, PartyClient, SignRound1Request,
    SignRoundReply, SignRoundRequest,
};
use crate::types::{CommitmentShare, Keychain, PendingApproval, SignatureShare, TxRequest};
use async_trait::async_trait;
use mpc_wallet_primitives::{MpcAlgorithm, Party, RoundMessages, SessionId};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// JSON-over-HTTP implementation of [`PartyClient`] against the Party
/// Signing Service.
#[derive(Clone)]
pub struct HttpPartyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPartyClient {
    pub fn new(base_url: Url) -> Self {
        HttpPartyClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.http.post(url).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

async fn expect_success(response: reqwest::Response) -> Result<(), ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeBody {
    source: Party,
}

#[async_trait]
impl PartyClient for HttpPartyClient {
    async fn initialize(&self, source: Party) -> Result<InitializedParty, ClientError> {
        self.post("keygen/initialize", &InitializeBody { source })
            .await
    }

    async fn keygen_round1(
        &self,
        request: KeygenRound1Request,
    ) -> Result<KeygenRound1Reply, ClientError> {
        self.post("keygen/round1", &request).await
    }

    async fn keygen_round2(
        &self,
        request: KeygenRound2Request,
    ) -> Result<KeygenRound2Reply, ClientError> {
        self.post("keygen/round2", &request).await
    }

    async fn keygen_round3(
        &self,
        request: KeygenRound3Request,
    ) -> Result<KeygenRound3Reply, ClientError> {
        self.post("keygen/round3", &request).await
    }

    async fn keygen_finalize(
        &self,
        request: KeygenFinalizeRequest,
    ) -> Result<KeygenFinalizeReply, ClientError> {
        self.post("keygen/finalize", &request).await
    }

    async fn sign_round1(&self, request: SignRound1Request) -> Result<SignRoundReply, ClientError> {
        self.post("sign/ecdsa/round1", &request).await
    }

    async fn sign_round2(&self, request: SignRoundRequest) -> Result<SignRoundReply, ClientError> {
        self.post("sign/ecdsa/round2", &request).await
    }

    async fn sign_round3(&self, request: SignRoundRequest) -> Result<SignRoundReply, ClientError> {
        self.post("sign/ecdsa/round3", &request).await
    }

    async fn eddsa_commitment(
        &self,
        request: EddsaCommitmentRequest,
    ) -> Result<EddsaCommitmentReply, ClientError> {
        self.post("sign/eddsa/commitment", &request).await
    }

    async fn eddsa_r_share(
        &self,
        request: EddsaRShareRequest,
    ) -> Result<EddsaRShareReply, ClientError> {
        self.post("sign/eddsa/rshare", &request).await
    }

    async fn eddsa_g_share(
        &self,
        request: EddsaGShareRequest,
    ) -> Result<EddsaGShareReply, ClientError> {
        self.post("sign/eddsa/gshare", &request).await
    }
}

/// JSON-over-HTTP implementation of [`CoordinatorClient`] against the
/// Coordinator Service.
#[derive(Clone)]
pub struct HttpCoordinatorClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCoordinatorClient {
    pub fn new(base_url: Url) -> Self {
        HttpCoordinatorClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.http.post(url).json(body).send().await?;
        decode(response).await
    }

    async fn post_unit<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.http.post(url).json(body).send().await?;
        expect_success(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeygenRoundBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_gpg_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_gpg_key: Option<&'a str>,
    messages: RoundMessages,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureShareBody {
    share: SignatureShare,
    algorithm: MpcAlgorithm,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitmentBody {
    commitment: CommitmentShare,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OfferRShareBody<'a> {
    r_share: SignatureShare,
    encrypted_signer_share: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GShareBody {
    g_share: SignatureShare,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyReply {
    public_key: String,
}

#[async_trait]
impl CoordinatorClient for HttpCoordinatorClient {
    async fn coordinator_public_key(&self) -> Result<String, ClientError> {
        let reply: PublicKeyReply = self.get("tss/publickey").await?;
        Ok(reply.public_key)
    }

    async fn send_keygen_round1(
        &self,
        enterprise: &str,
        user_gpg_key: &str,
        backup_gpg_key: &str,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenRound1Reply, ClientError> {
        self.post(
            &format!("enterprise/{enterprise}/keygen/round1"),
            &KeygenRoundBody {
                session_id: None,
                user_gpg_key: Some(user_gpg_key),
                backup_gpg_key: Some(backup_gpg_key),
                messages,
            },
        )
        .await
    }

    async fn send_keygen_round2(
        &self,
        enterprise: &str,
        session_id: &SessionId,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenRound2Reply, ClientError> {
        self.post(
            &format!("enterprise/{enterprise}/keygen/round2"),
            &KeygenRoundBody {
                session_id: Some(session_id),
                user_gpg_key: None,
                backup_gpg_key: None,
                messages,
            },
        )
        .await
    }

    async fn send_keygen_finalize(
        &self,
        enterprise: &str,
        session_id: &SessionId,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenFinalizeReply, ClientError> {
        self.post(
            &format!("enterprise/{enterprise}/keygen/finalize"),
            &KeygenRoundBody {
                session_id: Some(session_id),
                user_gpg_key: None,
                backup_gpg_key: None,
                messages,
            },
        )
        .await
    }

    async fn add_keychain(
        &self,
        request: AddKeychainRequest,
    ) -> Result<AddedKeychain, ClientError> {
        self.post("keychains", &request).await
    }

    async fn get_keychain(
        &self,
        wallet_id: &str,
        party: Party,
    ) -> Result<Option<Keychain>, ClientError> {
        let url = self
            .base_url
            .join(&format!("wallet/{wallet_id}/keychain/{party}"))?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(decode(response).await?))
    }

    async fn get_tx_request(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
    ) -> Result<TxRequest, ClientError> {
        self.get(&format!("wallet/{wallet_id}/txrequests/{tx_request_id}"))
            .await
    }

    async fn send_signature_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        share: SignatureShare,
        algorithm: MpcAlgorithm,
    ) -> Result<TxRequest, ClientError> {
        self.post(
            &format!("wallet/{wallet_id}/txrequests/{tx_request_id}/signatureshares"),
            &SignatureShareBody { share, algorithm },
        )
        .await
    }

    async fn exchange_commitments(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        commitment: CommitmentShare,
    ) -> Result<CommitmentShare, ClientError> {
        self.post(
            &format!("wallet/{wallet_id}/txrequests/{tx_request_id}/commitmentshares"),
            &CommitmentBody { commitment },
        )
        .await
    }

    async fn offer_r_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        r_share: SignatureShare,
        encrypted_signer_share: &str,
    ) -> Result<(), ClientError> {
        self.post_unit(
            &format!("wallet/{wallet_id}/txrequests/{tx_request_id}/rshares"),
            &OfferRShareBody {
                r_share,
                encrypted_signer_share,
            },
        )
        .await
    }

    async fn get_r_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
    ) -> Result<SignatureShare, ClientError> {
        self.get(&format!(
            "wallet/{wallet_id}/txrequests/{tx_request_id}/rshares"
        ))
        .await
    }

    async fn send_g_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        g_share: SignatureShare,
    ) -> Result<(), ClientError> {
        self.post_unit(
            &format!("wallet/{wallet_id}/txrequests/{tx_request_id}/gshares"),
            &GShareBody { g_share },
        )
        .await
    }

    async fn get_pending_approval(&self, id: &str) -> Result<PendingApproval, ClientError> {
        self.get(&format!("pendingapprovals/{id}")).await
    }
}
