//! Participant instances of one operation
//!
//! [`ParticipantSet`] owns every participant loaded for an operation, in
//! discovery order. [`SharableParticipants`] remembers which instance serves
//! a (descriptor, processor) pair so a sharable participant receives further
//! elements through `add_element` instead of being instantiated again.

use std::collections::HashMap;
use std::fmt;

use crate::participant::RefactoringParticipant;

/// Index of sharable participant instances keyed by (descriptor id,
/// processor id)
#[derive(Debug, Default, Clone)]
pub struct SharableParticipants {
    instances: HashMap<(String, String), usize>,
}

impl SharableParticipants {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the instance serving `descriptor_id` for `processor_id`
    pub fn get(&self, descriptor_id: &str, processor_id: &str) -> Option<usize> {
        self.instances
            .get(&(descriptor_id.to_string(), processor_id.to_string()))
            .copied()
    }

    /// Remember the instance at `index`
    pub fn put(&mut self, descriptor_id: &str, processor_id: &str, index: usize) {
        self.instances
            .insert((descriptor_id.to_string(), processor_id.to_string()), index);
    }

    /// Number of shared instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is shared
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// A participant together with the descriptor it was created from
pub struct LoadedParticipant {
    descriptor_id: String,
    participant: Box<dyn RefactoringParticipant>,
}

impl LoadedParticipant {
    /// Id of the originating descriptor
    pub fn descriptor_id(&self) -> &str {
        &self.descriptor_id
    }

    /// The participant
    pub fn participant(&self) -> &dyn RefactoringParticipant {
        self.participant.as_ref()
    }

    /// The participant, mutably
    pub fn participant_mut(&mut self) -> &mut dyn RefactoringParticipant {
        self.participant.as_mut()
    }
}

impl fmt::Debug for LoadedParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedParticipant")
            .field("descriptor_id", &self.descriptor_id)
            .field("name", &self.participant.name())
            .finish()
    }
}

/// Arena of the participants of one operation
#[derive(Debug, Default)]
pub struct ParticipantSet {
    participants: Vec<LoadedParticipant>,
    shared: SharableParticipants,
}

impl ParticipantSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant; sharable ones are indexed for `processor_id`.
    /// Returns its position.
    pub fn push(
        &mut self,
        descriptor_id: &str,
        processor_id: &str,
        mut participant: Box<dyn RefactoringParticipant>,
    ) -> usize {
        let index = self.participants.len();
        if participant.as_sharable().is_some() {
            self.shared.put(descriptor_id, processor_id, index);
        }
        self.participants.push(LoadedParticipant {
            descriptor_id: descriptor_id.to_string(),
            participant,
        });
        index
    }

    /// The sharable instance serving `descriptor_id` for `processor_id`
    pub fn shared_mut(
        &mut self,
        descriptor_id: &str,
        processor_id: &str,
    ) -> Option<&mut LoadedParticipant> {
        let index = self.shared.get(descriptor_id, processor_id)?;
        self.participants.get_mut(index)
    }

    /// Shared-instance index
    pub fn sharable(&self) -> &SharableParticipants {
        &self.shared
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &LoadedParticipant> {
        self.participants.iter()
    }

    /// Participant at `index`, mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut LoadedParticipant> {
        self.participants.get_mut(index)
    }

    /// Participant names in discovery order
    pub fn names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.participant.name().to_string())
            .collect()
    }
}
