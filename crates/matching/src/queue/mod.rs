// Copyright 2025 The Ferrox Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use ferrox_sdk::{OrderId, Price, Quantity};

use crate::types::Order;

/// Commands consumed by the matching loop
///
/// Submit carries a fully admitted order: id and admission timestamp are
/// assigned before enqueueing so callers learn the id immediately.
#[derive(Debug, Clone)]
pub enum EngineCommand {
	Submit(Order),
	Cancel {
		order_id: OrderId,
		reason: String,
	},
	/// Cancel-then-new under the same id; not a FIX CancelReplace
	Modify {
		order_id: OrderId,
		new_price: Price,
		new_quantity: Quantity,
	},
	Shutdown,
}

/// Command queue between the admission layer and the matching loop
///
/// Multiple producers (gateway connection tasks), single consumer (the
/// matching thread). Bounded: a full queue signals overload back to the
/// caller instead of buffering without limit.
///
/// Commands enqueued by one producer are processed in enqueue order;
/// producers are not ordered relative to each other.
pub struct CommandQueue {
	sender: Sender<EngineCommand>,
	receiver: Receiver<EngineCommand>,
}

impl CommandQueue {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split into the cloneable sender side and the unique receiver side.
	pub fn split(self) -> (CommandSender, CommandReceiver) {
		(
			CommandSender {
				sender: self.sender,
			},
			CommandReceiver {
				receiver: self.receiver,
			},
		)
	}
}

/// Producer end; clone freely across tasks.
#[derive(Clone)]
pub struct CommandSender {
	sender: Sender<EngineCommand>,
}

impl CommandSender {
	/// Enqueue without blocking. `Full` means the engine is overloaded and
	/// the order should be rejected upstream.
	pub fn try_enqueue(&self, cmd: EngineCommand) -> Result<(), QueueError> {
		self.sender.try_send(cmd).map_err(|e| match e {
			TrySendError::Full(_) => QueueError::Full,
			TrySendError::Disconnected(_) => QueueError::Disconnected,
		})
	}

	pub fn is_full(&self) -> bool {
		self.sender.is_full()
	}
}

/// Consumer end; owned by the single matching loop.
pub struct CommandReceiver {
	receiver: Receiver<EngineCommand>,
}

impl CommandReceiver {
	/// Blocking receive; the matching loop's idle state.
	pub fn recv(&self) -> Result<EngineCommand, QueueError> {
		self.receiver.recv().map_err(|_| QueueError::Disconnected)
	}

	pub fn try_recv(&self) -> Result<EngineCommand, QueueError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => QueueError::Empty,
			TryRecvError::Disconnected => QueueError::Disconnected,
		})
	}
}

/// Errors interacting with the command queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
	#[error("queue is full")]
	Full,
	#[error("queue is empty")]
	Empty,
	#[error("queue disconnected")]
	Disconnected,
}
