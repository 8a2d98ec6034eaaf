// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client side of the flow protocol, as the messaging platform runs it.
#![allow(dead_code)]

use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, Aead, KeyInit},
    aes::Aes128,
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use flow_gateway::crypto::{flip_iv, parse_private_key_pem};
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use serde_json::{json, Value};
use sha2::Sha256;

pub const FLOW_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/flow_private_key.pem");
pub const ROTATED_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/rotated_private_key.pem");

type FlowCipher = AesGcm<Aes128, U16>;

pub fn public_key(private_pem: &str) -> RsaPublicKey {
    RsaPublicKey::from(&parse_private_key_pem(private_pem).unwrap())
}

/// One encrypted request together with the secrets needed to read the reply
pub struct ClientRequest {
    pub aes_key: [u8; 16],
    pub iv: [u8; 16],
    pub encrypted_flow_data: Vec<u8>,
    pub encrypted_aes_key: Vec<u8>,
}

impl ClientRequest {
    /// Encrypt raw plaintext for the holder of `private_pem`
    pub fn seal(plaintext: &[u8], private_pem: &str) -> Self {
        let mut rng = rand::thread_rng();
        let mut aes_key = [0u8; 16];
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut aes_key);
        rng.fill_bytes(&mut iv);

        let cipher = FlowCipher::new_from_slice(&aes_key).unwrap();
        let encrypted_flow_data = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext)
            .unwrap();
        let encrypted_aes_key = public_key(private_pem)
            .encrypt(&mut rng, Oaep::new::<Sha256>(), &aes_key)
            .unwrap();

        Self {
            aes_key,
            iv,
            encrypted_flow_data,
            encrypted_aes_key,
        }
    }

    /// Encrypt `action` for the fixture key
    pub fn new(action: &Value) -> Self {
        Self::seal(&serde_json::to_vec(action).unwrap(), FLOW_PRIVATE_KEY_PEM)
    }

    pub fn envelope(&self) -> Value {
        json!({
            "encrypted_flow_data": B64.encode(&self.encrypted_flow_data),
            "encrypted_aes_key": B64.encode(&self.encrypted_aes_key),
            "initial_vector": B64.encode(self.iv),
        })
    }

    pub fn body(&self) -> String {
        self.envelope().to_string()
    }

    /// Decrypt a base64 response body with the flipped IV
    pub fn open_response(&self, body: &str) -> Value {
        let sealed = B64.decode(body.trim()).unwrap();
        let cipher = FlowCipher::new_from_slice(&self.aes_key).unwrap();
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(&flip_iv(&self.iv)), sealed.as_slice())
            .unwrap();
        serde_json::from_slice(&plaintext).unwrap()
    }
}
