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

//! Tools for validating raw signatures found in time stamp tokens and
//! certificates.

pub(crate) mod oids;

mod validator;
pub use validator::{
    validator_for_certificate_sig_alg, validator_for_sig_and_hash_algs,
    RawSignatureValidationError, RawSignatureValidator,
};

pub(crate) mod validators;
