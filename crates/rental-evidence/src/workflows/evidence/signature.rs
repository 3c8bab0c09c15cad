use tracing::info;
use uuid::Uuid;

use super::domain::{Actor, PhaseKind, RentalId, SignatureArtifact};
use super::errors::{EvidenceError, ValidationError};
use super::image::signature_content_type;
use super::service::EvidenceService;
use super::store::{EvidenceStore, FieldUpdate};

/// Only presence and size are checked; the payload is otherwise opaque.
pub fn validate_signature(payload: &[u8], max_bytes: usize) -> Result<(), ValidationError> {
    if payload.is_empty() {
        return Err(ValidationError::EmptySignature);
    }
    if payload.len() > max_bytes {
        return Err(ValidationError::SignatureTooLarge {
            size: payload.len(),
            max: max_bytes,
        });
    }
    Ok(())
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    /// Stores a signature for the phase. Signing again replaces the previous artifact.
    pub async fn set_signature(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        payload: Vec<u8>,
    ) -> Result<SignatureArtifact, EvidenceError> {
        let rental = self.load_for_write(actor, rental_id, "sign").await?;
        validate_signature(&payload, self.config.max_image_bytes)?;

        let (content_type, extension) = signature_content_type(&payload);
        let blob_path = format!(
            "rentals/{}/{}/signature-{}.{extension}",
            rental.id,
            phase.slug(),
            Uuid::new_v4().simple()
        );
        let image_url = self
            .store
            .upload_blob(&blob_path, payload, &content_type)
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))?;

        let signature = SignatureArtifact {
            image_url,
            content_type,
            signed_at: self.now(),
        };
        let update = FieldUpdate::Signature {
            phase,
            signature: signature.clone(),
        };
        let path = update.path();
        self.store
            .set_field(rental_id, update)
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))?;

        info!(rental_id = %rental_id, %path, resigned = rental.phase(phase).is_signed(), "signature stored");
        self.note_evidence(&rental, phase).await?;
        Ok(signature)
    }
}
