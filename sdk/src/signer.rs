// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use asic_crypto::{hash::DigestAlgorithm, time_stamp::TimeStampProvider};

use crate::{signature::AdvancedSignature, Container, Context, Error, Result};

/// The `Signer` trait supplies what a container needs to add a new
/// signature.
///
/// Time stamp signatures only need a [`TimeStampProvider`]; when the
/// signer has none, the context's provider is used. XML advanced
/// signatures are produced by an external engine through
/// [`Signer::sign_advanced`] and [`Signer::signature_value`].
pub trait Signer {
    /// User agent for time stamp requests. Defaults to the context's.
    fn user_agent(&self) -> Option<String> {
        None
    }

    /// Time stamp authority to use. Defaults to the context's.
    fn time_stamp_provider(&self) -> Option<&dyn TimeStampProvider> {
        None
    }

    /// Digest algorithm for new time stamps. Defaults to the
    /// `time_stamp.digest_algorithm` setting.
    fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        None
    }

    /// Prepares an XML advanced signature with the given identifier over
    /// the data files of `container`.
    fn sign_advanced(
        &self,
        _signature_id: &str,
        _container: &Container,
        _ctx: &Context,
    ) -> Result<Box<dyn AdvancedSignature>> {
        Err(Error::NotImplemented(
            "signer does not create XML advanced signatures".into(),
        ))
    }

    /// Computes a signature value over `data_to_sign`.
    fn signature_value(&self, _data_to_sign: &[u8]) -> Result<Vec<u8>> {
        Err(Error::NotImplemented(
            "signer does not compute signature values".into(),
        ))
    }
}

/// A [`Signer`] that only obtains time stamps.
///
/// This is the signer to use with ASiC-S containers.
#[derive(Default)]
pub struct TimeStampSigner {
    provider: Option<Box<dyn TimeStampProvider + Send + Sync>>,
    user_agent: Option<String>,
    digest_algorithm: Option<DigestAlgorithm>,
}

impl TimeStampSigner {
    /// Creates a signer that uses the context's time stamp authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `provider` instead of the context's time stamp authority.
    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: TimeStampProvider + Send + Sync + 'static,
    {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_digest_algorithm(mut self, alg: DigestAlgorithm) -> Self {
        self.digest_algorithm = Some(alg);
        self
    }
}

impl Signer for TimeStampSigner {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn time_stamp_provider(&self) -> Option<&dyn TimeStampProvider> {
        self.provider
            .as_ref()
            .map(|provider| &**provider as &dyn TimeStampProvider)
    }

    fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.digest_algorithm
    }
}
